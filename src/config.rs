// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::types::records::SchoolYearId;

pub const DEFAULT_CONFIG_PATH: &str = "weekplan.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The configuration file. Every field can also come from the environment.
#[derive(Deserialize, Default, Debug)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    school_year: Option<SchoolYearId>,
    csrf_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Config {
    pub base_url: String,
    pub school_year: SchoolYearId,
    pub csrf_token: Option<String>,
    pub timeout: Duration,
}

impl Config {
    /// Read the file at `path`, if there is one, and apply the
    /// `WEEKPLAN_*` environment variables over it.
    pub fn load(path: &Path) -> Fallible<Self> {
        let contents = if path.exists() {
            log::debug!("Reading configuration from {}.", path.display());
            Some(std::fs::read_to_string(path)?)
        } else {
            log::debug!("No configuration file at {}.", path.display());
            None
        };
        Self::resolve(contents.as_deref(), |key| std::env::var(key).ok())
    }

    fn resolve(contents: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Fallible<Self> {
        let file: ConfigFile = match contents {
            Some(contents) => toml::from_str(contents)?,
            None => ConfigFile::default(),
        };
        let Some(base_url) = env("WEEKPLAN_BASE_URL").or(file.base_url) else {
            return fail("no base URL: set base_url in the configuration file or WEEKPLAN_BASE_URL.");
        };
        let school_year = match env("WEEKPLAN_SCHOOL_YEAR") {
            Some(value) => value.trim().parse::<SchoolYearId>().map_err(|_| {
                ErrorReport::new(format!("invalid WEEKPLAN_SCHOOL_YEAR: {value:?}"))
            })?,
            None => match file.school_year {
                Some(year) => year,
                None => return fail("school year is not configured."),
            },
        };
        let csrf_token = env("WEEKPLAN_CSRF_TOKEN")
            .or(file.csrf_token)
            .filter(|token| !token.is_empty());
        let timeout = Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        Ok(Self {
            base_url,
            school_year,
            csrf_token,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const FILE: &str = r#"
base_url = "https://school.example/timetable/"
school_year = 3
csrf_token = "from-file"
"#;

    #[test]
    fn test_file_only() -> Fallible<()> {
        let config = Config::resolve(Some(FILE), env(&[]))?;
        assert_eq!(
            config,
            Config {
                base_url: "https://school.example/timetable/".to_string(),
                school_year: 3,
                csrf_token: Some("from-file".to_string()),
                timeout: Duration::from_secs(30),
            }
        );
        Ok(())
    }

    #[test]
    fn test_environment_wins() -> Fallible<()> {
        let config = Config::resolve(
            Some(FILE),
            env(&[
                ("WEEKPLAN_BASE_URL", "http://localhost:8000/"),
                ("WEEKPLAN_CSRF_TOKEN", "from-env"),
                ("WEEKPLAN_SCHOOL_YEAR", "4"),
            ]),
        )?;
        assert_eq!(config.base_url, "http://localhost:8000/");
        assert_eq!(config.csrf_token.as_deref(), Some("from-env"));
        assert_eq!(config.school_year, 4);
        Ok(())
    }

    #[test]
    fn test_environment_without_file() -> Fallible<()> {
        let config = Config::resolve(
            None,
            env(&[
                ("WEEKPLAN_BASE_URL", "http://localhost:8000/"),
                ("WEEKPLAN_SCHOOL_YEAR", "2"),
            ]),
        )?;
        assert_eq!(config.csrf_token, None);
        assert!(Config::resolve(None, env(&[])).is_err());
        Ok(())
    }

    #[test]
    fn test_missing_school_year() {
        let result = Config::resolve(Some("base_url = \"http://localhost/\"\n"), env(&[]));
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("error: school year is not configured.".to_string())
        );
        let result = Config::resolve(Some(FILE), env(&[("WEEKPLAN_SCHOOL_YEAR", "three")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = Config::resolve(Some("base_url = \"x\"\nschool_year = 1\nport = 80\n"), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_PATH);
        std::fs::write(&path, format!("{FILE}timeout_secs = 5\n"))?;
        let config = Config::load(&path)?;
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.school_year, 3);
        Ok(())
    }
}
