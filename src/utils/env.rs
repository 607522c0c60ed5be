use std::collections::HashMap;
use std::ffi::OsString;

/// Snapshot of the process environment taken once at startup.
///
/// Components read variables through this instead of `std::env` so a run
/// can be reproduced from a fixed set of values.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Read `.env` from the working directory (if any) and capture the
    /// process environment on top of it. Real variables win over `.env`
    /// entries. The process environment itself is never modified.
    pub fn from_process() -> Self {
        let dotenv: Vec<(String, String)> = dotenvy::dotenv_iter()
            .map(|iter| iter.filter_map(|item| item.ok()).collect())
            .unwrap_or_default();
        Self::layered(dotenv, std::env::vars_os())
    }

    /// `process` entries override `dotenv` entries. Process entries whose
    /// name or value is not valid UTF-8 are skipped.
    fn layered<D, P>(dotenv: D, process: P) -> Self
    where
        D: IntoIterator<Item = (String, String)>,
        P: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut vars: HashMap<String, String> = dotenv.into_iter().collect();
        vars.extend(process.into_iter().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }));
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Like `get`, but blank values count as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}
