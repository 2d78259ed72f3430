//! Synthetic job records.
//!
//! A run derives every record from one immutable [`Template`]: the document
//! is cloned, `JobId` and `CustomerName` are substituted, and the copy is
//! handed out by value. Nothing the generator returns aliases the template.

use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::Job;

/// Field holding the job id.
pub const JOB_ID_FIELD: &str = "JobId";

/// Field holding the randomized customer name.
pub const CUSTOMER_NAME_FIELD: &str = "CustomerName";

/// The base document every job record is derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    document: Map<String, Value>,
}

impl Template {
    /// Build a template from a parsed JSON value.
    ///
    /// The value must be an object carrying `JobId` and `CustomerName`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(document) = value else {
            return Err(Error::Configuration(
                "template must be a JSON object".to_string(),
            ));
        };

        for field in [JOB_ID_FIELD, CUSTOMER_NAME_FIELD] {
            if !document.contains_key(field) {
                return Err(Error::Configuration(format!(
                    "template is missing top-level field {}",
                    field
                )));
            }
        }

        Ok(Self { document })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Load a template from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read template {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Decode the template into the typed job model.
    pub fn to_typed(&self) -> Result<Job> {
        serde_json::from_value(Value::Object(self.document.clone())).map_err(|e| {
            Error::Configuration(format!("template does not match the job model: {}", e))
        })
    }
}

/// First- and last-name pools for customer names.
#[derive(Debug, Clone)]
pub struct NamePools {
    first: Vec<String>,
    last: Vec<String>,
}

impl NamePools {
    /// Create pools from name lists. Both lists must be non-empty.
    pub fn new(first: Vec<String>, last: Vec<String>) -> Result<Self> {
        if first.is_empty() {
            return Err(Error::Configuration("first-name pool is empty".to_string()));
        }
        if last.is_empty() {
            return Err(Error::Configuration("last-name pool is empty".to_string()));
        }
        Ok(Self { first, last })
    }

    /// Load pools from two newline-delimited files.
    pub fn from_paths(first: impl AsRef<Path>, last: impl AsRef<Path>) -> Result<Self> {
        Self::new(read_names(first.as_ref())?, read_names(last.as_ref())?)
    }

    /// Split newline-delimited text into names, skipping blank lines.
    pub fn parse_names(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Draw `"<first> <last>"` uniformly, with replacement.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        // Pools are non-empty by construction.
        let first = self.first.choose(rng).map(String::as_str).unwrap_or_default();
        let last = self.last.choose(rng).map(String::as_str).unwrap_or_default();
        format!("{} {}", first, last)
    }

    pub fn first_names(&self) -> &[String] {
        &self.first
    }

    pub fn last_names(&self) -> &[String] {
        &self.last
    }
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("cannot read name list {}: {}", path.display(), e))
    })?;
    Ok(NamePools::parse_names(&text))
}

/// One generated job document.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    id: u64,
    document: Value,
}

impl JobRecord {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn customer_name(&self) -> &str {
        self.document
            .get(CUSTOMER_NAME_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Compact JSON text, as stored by text-valued backends.
    pub fn to_json(&self) -> String {
        self.document.to_string()
    }

    /// Decode into the typed job model.
    pub fn to_typed(&self) -> Result<Job> {
        Ok(serde_json::from_value(self.document.clone())?)
    }
}

/// Produces job records from a template and name pools.
#[derive(Debug, Clone)]
pub struct JobGenerator {
    template: Template,
    names: NamePools,
}

impl JobGenerator {
    pub fn new(template: Template, names: NamePools) -> Self {
        Self { template, names }
    }

    /// Load template and name pools from disk.
    pub fn from_paths(
        template: impl AsRef<Path>,
        first_names: impl AsRef<Path>,
        last_names: impl AsRef<Path>,
    ) -> Result<Self> {
        Ok(Self::new(
            Template::from_path(template)?,
            NamePools::from_paths(first_names, last_names)?,
        ))
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Produce one independent record with the given id.
    pub fn produce<R: Rng + ?Sized>(&self, id: u64, rng: &mut R) -> JobRecord {
        let mut document = self.template.document.clone();
        document.insert(JOB_ID_FIELD.to_string(), Value::from(id));
        document.insert(
            CUSTOMER_NAME_FIELD.to_string(),
            Value::String(self.names.pick(rng)),
        );

        JobRecord {
            id,
            document: Value::Object(document),
        }
    }

    /// Produce `count` records with ids `0..count`.
    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<JobRecord> {
        (0..count as u64).map(|id| self.produce(id, rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn minimal_generator() -> JobGenerator {
        let template = Template::from_json_str(r#"{"JobId":0,"CustomerName":""}"#).unwrap();
        let names = NamePools::new(vec!["Ann".into()], vec!["Lee".into()]).unwrap();
        JobGenerator::new(template, names)
    }

    #[test]
    fn test_generate_minimal_template() {
        let mut rng = StdRng::seed_from_u64(1);
        let records = minimal_generator().generate(3, &mut rng);

        let ids: Vec<_> = records.iter().map(JobRecord::id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        for record in &records {
            assert_eq!(record.customer_name(), "Ann Lee");
            assert_eq!(record.document()[JOB_ID_FIELD], record.id());
        }
    }

    #[test]
    fn test_generate_zero_records() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(minimal_generator().generate(0, &mut rng).is_empty());
    }

    #[test]
    fn test_non_randomized_fields_match_template() {
        let template = Template::from_json_str(
            r#"{"JobId":0,"CustomerName":"","Cost":12.5,"Nodes":[{"Time":"t","Address":{"Id":3}}]}"#,
        )
        .unwrap();
        let names = NamePools::new(vec!["A".into(), "B".into()], vec!["C".into()]).unwrap();
        let generator = JobGenerator::new(template.clone(), names);
        let mut rng = StdRng::seed_from_u64(7);

        let records = generator.generate(50, &mut rng);
        let ids: HashSet<_> = records.iter().map(JobRecord::id).collect();
        assert_eq!(ids.len(), 50);

        for record in &records {
            let doc = record.document().as_object().unwrap();
            assert_eq!(doc.len(), template.document().len());
            for (key, value) in template.document() {
                if key != JOB_ID_FIELD && key != CUSTOMER_NAME_FIELD {
                    assert_eq!(&doc[key], value);
                }
            }
        }
    }

    #[test]
    fn test_records_do_not_alias_template() {
        let generator = minimal_generator();
        let mut rng = StdRng::seed_from_u64(3);
        let mut record = generator.produce(41, &mut rng);

        if let Value::Object(doc) = &mut record.document {
            doc.insert("Extra".into(), Value::Bool(true));
        }

        assert!(!generator.template().document().contains_key("Extra"));
        assert_eq!(generator.template().document()[JOB_ID_FIELD], 0);
        assert_eq!(generator.produce(42, &mut rng).document().get("Extra"), None);
    }

    #[test]
    fn test_every_name_is_reachable() {
        let names = NamePools::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["X".into(), "Y".into()],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let drawn: HashSet<_> = (0..500).map(|_| names.pick(&mut rng)).collect();
        assert_eq!(drawn.len(), 6);
    }

    #[test]
    fn test_empty_pool_is_configuration_error() {
        let err = NamePools::new(vec![], vec!["Lee".into()]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = NamePools::new(vec!["Ann".into()], vec![]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_template_requires_fields() {
        assert!(matches!(
            Template::from_json_str(r#"{"JobId":0}"#).unwrap_err(),
            Error::Configuration(_)
        ));
        assert!(matches!(
            Template::from_json_str("[1, 2]").unwrap_err(),
            Error::Configuration(_)
        ));
        assert!(matches!(
            Template::from_json_str("{not json").unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn test_parse_names() {
        let names = NamePools::parse_names("Ann\r\nBob\n\n  \nCid\n");
        assert_eq!(names, vec!["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("job.json");
        let first = dir.path().join("firstnames.txt");
        let last = dir.path().join("lastnames.txt");
        fs::write(&template, r#"{"JobId":0,"CustomerName":"","Cost":1}"#).unwrap();
        fs::write(&first, "Ann\n").unwrap();
        fs::write(&last, "Lee\n").unwrap();

        let generator = JobGenerator::from_paths(&template, &first, &last).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(generator.produce(5, &mut rng).customer_name(), "Ann Lee");

        let missing = JobGenerator::from_paths(dir.path().join("nope.json"), &first, &last);
        assert!(matches!(missing.unwrap_err(), Error::Configuration(_)));

        fs::write(&last, "\n\n").unwrap();
        let empty = JobGenerator::from_paths(&template, &first, &last);
        assert!(matches!(empty.unwrap_err(), Error::Configuration(_)));
    }
}
