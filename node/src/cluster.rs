//! The cluster configuration read from the `TF_CONFIG` environment variable.

use std::{
    env::{self, VarError},
    error::Error,
    fmt::{self, Display},
};

use serde::Deserialize;

/// The environment variable holding the cluster configuration.
pub const TF_CONFIG: &str = "TF_CONFIG";

/// The role of this process in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Ps,
    Worker,
    Master,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Ps => "ps",
            TaskType::Worker => "worker",
            TaskType::Master => "master",
        };

        f.write_str(name)
    }
}

/// The addresses of every task, by role, ordered by task index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClusterSpec {
    pub ps: Vec<String>,
    #[serde(default)]
    pub worker: Vec<String>,
    #[serde(default)]
    pub master: Vec<String>,
}

impl ClusterSpec {
    pub fn tasks(&self, kind: TaskType) -> &[String] {
        match kind {
            TaskType::Ps => &self.ps,
            TaskType::Worker => &self.worker,
            TaskType::Master => &self.master,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TaskSpec {
    #[serde(rename = "type")]
    pub kind: TaskType,
    pub index: usize,
}

/// The parsed `TF_CONFIG`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TfConfig {
    pub cluster: ClusterSpec,
    pub task: TaskSpec,
}

/// Errors found while reading the cluster configuration.
#[derive(Debug)]
pub enum ClusterErr {
    Json(serde_json::Error),
    NotUnicode,
    NoParameterServers,
    IndexOutOfRange {
        kind: TaskType,
        index: usize,
        len: usize,
    },
}

impl Display for ClusterErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterErr::Json(e) => write!(f, "invalid {TF_CONFIG}: {e}"),
            ClusterErr::NotUnicode => write!(f, "invalid {TF_CONFIG}: not valid unicode"),
            ClusterErr::NoParameterServers => {
                write!(f, "invalid {TF_CONFIG}: the cluster has no ps tasks")
            }
            ClusterErr::IndexOutOfRange { kind, index, len } => write!(
                f,
                "invalid {TF_CONFIG}: task {kind}:{index} but the cluster has {len} {kind} tasks"
            ),
        }
    }
}

impl Error for ClusterErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClusterErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClusterErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl TfConfig {
    /// Reads the configuration from `TF_CONFIG`.
    ///
    /// # Returns
    /// `None` when the variable is unset or empty, meaning standalone mode.
    pub fn from_env() -> Result<Option<Self>, ClusterErr> {
        Self::from_var(env::var(TF_CONFIG))
    }

    fn from_var(var: Result<String, VarError>) -> Result<Option<Self>, ClusterErr> {
        match var {
            Ok(raw) if !raw.trim().is_empty() => Self::parse(&raw).map(Some),
            Ok(_) | Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ClusterErr::NotUnicode),
        }
    }

    /// Parses and validates a json cluster configuration.
    pub fn parse(raw: &str) -> Result<Self, ClusterErr> {
        let config: Self = serde_json::from_str(raw)?;

        if config.cluster.ps.is_empty() {
            return Err(ClusterErr::NoParameterServers);
        }

        let TaskSpec { kind, index } = config.task;
        let len = config.cluster.tasks(kind).len();
        if index >= len {
            return Err(ClusterErr::IndexOutOfRange { kind, index, len });
        }

        Ok(config)
    }

    /// The amount of trainers every parameter server waits for.
    pub fn trainers(&self) -> usize {
        self.cluster.worker.len() + self.cluster.master.len()
    }

    pub fn is_chief(&self) -> bool {
        self.task.kind == TaskType::Master
    }

    /// The address of this task.
    pub fn task_addr(&self) -> &str {
        &self.cluster.tasks(self.task.kind)[self.task.index]
    }
}
