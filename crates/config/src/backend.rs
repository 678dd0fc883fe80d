//! Build backend selection (spec §6 `build_backend`).

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildBackend {
    /// Build locally via `docker build`/`buildx` on the daemon host.
    Local,
    /// Dispatch a short-lived cluster Job that builds and pushes.
    Cluster,
}

impl FromStr for BuildBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "cluster" => Ok(Self::Cluster),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for BuildBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Cluster => "cluster",
        })
    }
}
