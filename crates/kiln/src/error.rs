//! Error types.
//!
//! Most engine operations are infallible by contract: dead handles are
//! silently ignored and missing components come back as `None`. The errors
//! here cover the cases that are worth surfacing to the embedding
//! application: declared component invariants, scene-graph misuse, system
//! graph problems, config loading, and backend initialization.

use std::fmt;

use crate::ecs::Entity;
use crate::ecs::system::SystemId;
use crate::scene::NodeId;

// ── ComponentError ──────────────────────────────────────────────────────

/// Raised by [`World::try_add`](crate::ecs::World::try_add) when a
/// component's declared invariant is not met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The component requires a sibling component that the entity lacks.
    MissingRequired {
        component: &'static str,
        requires: &'static str,
        entity: Entity,
    },
    /// The target entity is not alive.
    DeadEntity {
        component: &'static str,
        entity: Entity,
    },
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentError::MissingRequired {
                component,
                requires,
                entity,
            } => write!(
                f,
                "component `{component}` on {entity:?} requires `{requires}`, which is missing"
            ),
            ComponentError::DeadEntity { component, entity } => {
                write!(f, "cannot add component `{component}` to dead entity {entity:?}")
            }
        }
    }
}

impl std::error::Error for ComponentError {}

// ── SceneError ──────────────────────────────────────────────────────────

/// Errors from [`SceneGraph`](crate::scene::SceneGraph) mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node does not exist or has been destroyed.
    DeadNode(NodeId),
    /// Reparenting would make a node its own ancestor.
    WouldCycle { child: NodeId, parent: NodeId },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::DeadNode(id) => write!(f, "scene node {id:?} is not alive"),
            SceneError::WouldCycle { child, parent } => write!(
                f,
                "cannot parent {child:?} under {parent:?}: {parent:?} is {child:?} or one of its descendants"
            ),
        }
    }
}

impl std::error::Error for SceneError {}

// ── SystemGraphError ────────────────────────────────────────────────────

/// Errors from [`SystemGraph`](crate::ecs::SystemGraph).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemGraphError {
    /// The id was never returned by `add_system`.
    UnknownSystem(SystemId),
    /// The dependency edges contain a cycle. `involved` lists every system
    /// that could not be scheduled.
    Cycle { involved: Vec<SystemId> },
}

impl fmt::Display for SystemGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemGraphError::UnknownSystem(id) => write!(f, "unknown system {id:?}"),
            SystemGraphError::Cycle { involved } => {
                write!(f, "system dependency cycle among {involved:?}")
            }
        }
    }
}

impl std::error::Error for SystemGraphError {}

// ── ConfigError ─────────────────────────────────────────────────────────

/// Failure to read or parse an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse failed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

// ── BackendError ────────────────────────────────────────────────────────

/// Errors reported by backend implementations (audio device, physics, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be initialized.
    Init(String),
    /// A resource (clip, mesh, ...) failed to load.
    Load(String),
    /// A handle did not refer to a live backend object.
    InvalidHandle(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Init(e) => write!(f, "backend init failed: {e}"),
            BackendError::Load(e) => write!(f, "backend load failed: {e}"),
            BackendError::InvalidHandle(e) => write!(f, "invalid backend handle: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

// ── EngineError ─────────────────────────────────────────────────────────

/// Umbrella error for code that mixes several engine subsystems.
#[derive(Debug)]
pub enum EngineError {
    Component(ComponentError),
    Scene(SceneError),
    SystemGraph(SystemGraphError),
    Config(ConfigError),
    Backend(BackendError),
    /// `Engine::start` called while the engine is already running.
    AlreadyRunning,
    /// `Engine::start` called after a shutdown released the backends.
    Finished,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::AlreadyRunning => write!(f, "engine is already running"),
            EngineError::Finished => {
                write!(f, "engine has shut down and released its backends")
            }
            EngineError::Component(e) => e.fmt(f),
            EngineError::Scene(e) => e.fmt(f),
            EngineError::SystemGraph(e) => e.fmt(f),
            EngineError::Config(e) => e.fmt(f),
            EngineError::Backend(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Component(e) => Some(e),
            EngineError::Scene(e) => Some(e),
            EngineError::SystemGraph(e) => Some(e),
            EngineError::Config(e) => Some(e),
            EngineError::Backend(e) => Some(e),
            EngineError::AlreadyRunning | EngineError::Finished => None,
        }
    }
}

impl From<ComponentError> for EngineError {
    fn from(e: ComponentError) -> Self {
        EngineError::Component(e)
    }
}

impl From<SceneError> for EngineError {
    fn from(e: SceneError) -> Self {
        EngineError::Scene(e)
    }
}

impl From<SystemGraphError> for EngineError {
    fn from(e: SystemGraphError) -> Self {
        EngineError::SystemGraph(e)
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

impl From<BackendError> for EngineError {
    fn from(e: BackendError) -> Self {
        EngineError::Backend(e)
    }
}
