//! Authorization scopes (§6 task submission contract).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Satisfies every other scope check.
    Admin,
    TaskCreate,
    TaskRead,
    TaskWrite,
    RunRead,
    EventPublish,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Admin => "admin",
            Scope::TaskCreate => "task.create",
            Scope::TaskRead => "task.read",
            Scope::TaskWrite => "task.write",
            Scope::RunRead => "run.read",
            Scope::EventPublish => "event.publish",
        }
    }
}
