use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::error::MatchError;
use crate::models::{ApplicationRecord, CandidateRecord, JobRecord, RawCandidate, RawJob, RawProspect};

pub const JOBS_FILE: &str = "vagas.json";
pub const CANDIDATES_FILE: &str = "applicants.json";
pub const PROSPECTS_FILE: &str = "prospects.json";

/// Errors that can occur while loading a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset file not found: {0}")]
    MissingFile(PathBuf),
}

/// Jobs, candidates and applications loaded from the JSON exports
///
/// Every file is an object keyed by identifier: `vagas.json` maps job id
/// to job, `applicants.json` candidate id to candidate and
/// `prospects.json` job id to a list of prospects. Entries that cannot be
/// parsed are skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    jobs: Vec<JobRecord>,
    candidates: Vec<CandidateRecord>,
    applications: Vec<ApplicationRecord>,
    job_index: HashMap<String, usize>,
    candidate_index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(jobs: Vec<JobRecord>, candidates: Vec<CandidateRecord>, applications: Vec<ApplicationRecord>) -> Self {
        let mut job_index = HashMap::new();
        for (i, job) in jobs.iter().enumerate() {
            job_index.entry(job.job_id.clone()).or_insert(i);
        }
        let mut candidate_index = HashMap::new();
        for (i, candidate) in candidates.iter().enumerate() {
            candidate_index.entry(candidate.candidate_id.clone()).or_insert(i);
        }

        Self {
            jobs,
            candidates,
            applications,
            job_index,
            candidate_index,
        }
    }

    /// True when all three export files exist under `dir`
    pub fn exists(dir: &Path) -> bool {
        [JOBS_FILE, CANDIDATES_FILE, PROSPECTS_FILE]
            .iter()
            .all(|file| dir.join(file).is_file())
    }

    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let jobs = read_keyed(&dir.join(JOBS_FILE))?
            .into_iter()
            .filter_map(|(id, value)| {
                let raw: RawJob = parse_entry(JOBS_FILE, &id, value)?;
                accept(JOBS_FILE, &id, raw.into_record(Some(&id)))
            })
            .collect::<Vec<_>>();

        let candidates = read_keyed(&dir.join(CANDIDATES_FILE))?
            .into_iter()
            .filter_map(|(id, value)| {
                let raw: RawCandidate = parse_entry(CANDIDATES_FILE, &id, value)?;
                accept(CANDIDATES_FILE, &id, raw.into_record(Some(&id)))
            })
            .collect::<Vec<_>>();

        let mut applications = Vec::new();
        for (job_id, value) in read_keyed(&dir.join(PROSPECTS_FILE))? {
            let Some(prospects): Option<Vec<Value>> = parse_entry(PROSPECTS_FILE, &job_id, value) else {
                continue;
            };
            for prospect in prospects {
                let Some(raw): Option<RawProspect> = parse_entry(PROSPECTS_FILE, &job_id, prospect) else {
                    continue;
                };
                if let Some(application) = accept(PROSPECTS_FILE, &job_id, raw.into_record(&job_id)) {
                    applications.push(application);
                }
            }
        }

        tracing::info!(
            jobs = jobs.len(),
            candidates = candidates.len(),
            applications = applications.len(),
            "Loaded dataset from {}",
            dir.display()
        );

        Ok(Self::new(jobs, candidates, applications))
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn candidates(&self) -> &[CandidateRecord] {
        &self.candidates
    }

    pub fn applications(&self) -> &[ApplicationRecord] {
        &self.applications
    }

    pub fn job(&self, id: &str) -> Option<&JobRecord> {
        self.job_index.get(id).map(|&i| &self.jobs[i])
    }

    pub fn candidate(&self, id: &str) -> Option<&CandidateRecord> {
        self.candidate_index.get(id).map(|&i| &self.candidates[i])
    }

    /// Write a small two-job demonstration dataset to `dir`
    pub fn write_sample(dir: &Path) -> Result<(), DatasetError> {
        std::fs::create_dir_all(dir)?;

        let jobs = serde_json::json!({
            "10976": {
                "titulo": "Desenvolvedor Python Sênior",
                "is_sap": false,
                "nivel_profissional": "Sênior",
                "nivel_ingles": "Intermediário",
                "nivel_espanhol": "Básico",
                "competencias_tecnicas": ["Python", "Django", "PostgreSQL", "Docker", "AWS"],
                "localizacao": "São Paulo - SP",
                "salario_range": "12000-18000"
            },
            "10977": {
                "titulo": "Analista SAP ABAP",
                "is_sap": true,
                "nivel_profissional": "Pleno",
                "nivel_ingles": "Avançado",
                "nivel_espanhol": "Não requerido",
                "competencias_tecnicas": ["SAP ABAP", "SAP ECC", "SAP S/4HANA", "SQL"],
                "localizacao": "Rio de Janeiro - RJ",
                "salario_range": "8000-12000"
            }
        });
        let candidates = serde_json::json!({
            "41496": {
                "nivel_academico": "Superior Completo",
                "nivel_ingles": "Intermediário",
                "nivel_espanhol": "Básico",
                "conhecimentos_tecnicos": ["Python", "Django", "Flask", "PostgreSQL", "Docker", "Git"],
                "anos_experiencia": 6,
                "localizacao": "São Paulo - SP",
                "pretensao_salarial": "15000"
            },
            "41497": {
                "nivel_academico": "Superior Completo",
                "nivel_ingles": "Avançado",
                "nivel_espanhol": "Não possui",
                "conhecimentos_tecnicos": ["SAP ABAP", "SAP ECC", "SAP S/4HANA", "SQL Server", "Oracle"],
                "anos_experiencia": 4,
                "localizacao": "Rio de Janeiro - RJ",
                "pretensao_salarial": "10000"
            }
        });
        let prospects = serde_json::json!({
            "10976": [
                {"codigo_candidato": "41496", "situacao": "Contratado", "comentario": "Excelente fit técnico"},
                {"codigo_candidato": "41497", "situacao": "Rejeitado", "comentario": "Perfil focado em SAP"}
            ],
            "10977": [
                {"codigo_candidato": "41497", "situacao": "Contratado", "comentario": "Perfil adequado"},
                {"codigo_candidato": "41496", "situacao": "Rejeitado", "comentario": "Sem experiência em SAP"}
            ]
        });

        for (file, value) in [(JOBS_FILE, jobs), (CANDIDATES_FILE, candidates), (PROSPECTS_FILE, prospects)] {
            std::fs::write(dir.join(file), serde_json::to_vec_pretty(&value).map_err(|source| {
                DatasetError::ParseError {
                    path: dir.join(file),
                    source,
                }
            })?)?;
        }

        tracing::info!("Sample data written to {}", dir.display());
        Ok(())
    }
}

fn read_keyed(path: &Path) -> Result<BTreeMap<String, Value>, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::MissingFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|source| DatasetError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_entry<T: DeserializeOwned>(file: &str, id: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::warn!(file, id, error = %error, "skipping malformed entry");
            None
        }
    }
}

fn accept<T>(file: &str, id: &str, record: Result<T, MatchError>) -> Option<T> {
    match record {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(file, id, error = %error, "skipping invalid record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfessionalLevel;

    #[test]
    fn test_load_sample_dataset() {
        let dir = tempfile::tempdir().unwrap();
        Dataset::write_sample(dir.path()).unwrap();
        assert!(Dataset::exists(dir.path()));

        let dataset = Dataset::load(dir.path()).unwrap();
        assert_eq!(dataset.jobs().len(), 2);
        assert_eq!(dataset.candidates().len(), 2);
        assert_eq!(dataset.applications().len(), 4);

        let job = dataset.job("10977").unwrap();
        assert!(job.requires_specialization);
        assert_eq!(job.level, Some(ProfessionalLevel::Mid));

        let candidate = dataset.candidate("41496").unwrap();
        assert_eq!(candidate.experience_years, 6);
        assert_eq!(candidate.salary_expectation, Some(15000.0));
        assert!(dataset.candidate("nope").is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingFile(_)));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(JOBS_FILE),
            r#"{"J1": {"competencias_tecnicas": "Rust, Tokio"}, "J2": 42}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(CANDIDATES_FILE), r#"{"C1": {"anos_experiencia": "5"}}"#).unwrap();
        std::fs::write(
            dir.path().join(PROSPECTS_FILE),
            r#"{"J1": [{"codigo_candidato": "C1", "situacao": "Contratado"}, {"situacao": "Rejeitado"}], "J2": "x"}"#,
        )
        .unwrap();

        let dataset = Dataset::load(dir.path()).unwrap();
        assert_eq!(dataset.jobs().len(), 1);
        assert_eq!(dataset.jobs()[0].required_skills, vec!["Rust", "Tokio"]);
        assert_eq!(dataset.candidates()[0].experience_years, 5);
        assert_eq!(dataset.applications().len(), 1);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(JOBS_FILE), "{not json").unwrap();
        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, DatasetError::ParseError { .. }));
    }
}
