use crate::{ConfigErr, Party, Result, Settings};

/// The generic name accepted for whichever party coordinates the run.
pub const COORDINATOR_ROLE: &str = "coordinator";

/// The part a process plays in a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role<'a> {
    Coordinator(&'a Party),
    Participant(&'a Party),
}

impl<'a> Role<'a> {
    /// Resolves a role identifier against the roster.
    ///
    /// # Arguments
    /// * `settings` - The validated configuration.
    /// * `role` - Either `"coordinator"`, the coordinator's name or a participant's name.
    ///
    /// # Errors
    /// `ConfigErr::UnknownRole` if the identifier names no party.
    pub fn resolve(settings: &'a Settings, role: &str) -> Result<Self> {
        let coordinator = settings.coordinator();

        if role == COORDINATOR_ROLE || role == coordinator.name() {
            return Ok(Self::Coordinator(coordinator));
        }

        settings
            .participant(role)
            .map(Self::Participant)
            .ok_or_else(|| ConfigErr::UnknownRole(role.to_string()))
    }

    pub fn party(&self) -> &'a Party {
        match self {
            Self::Coordinator(party) | Self::Participant(party) => party,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"
        [roster]
        coordinator = "central"
        participants = ["alice"]

        [parties.central]
        host = "localhost"
        port = 7000

        [parties.alice]
        host = "localhost"
        port = 7001

        [experiment]
        data_columns = ["x"]
        target_column = "y"
        n_epochs = 1
        learning_rate = 0.1
    "#;

    #[test]
    fn resolves_roles() {
        let settings: Settings = SETTINGS.parse().unwrap();

        assert!(matches!(
            Role::resolve(&settings, "coordinator").unwrap(),
            Role::Coordinator(party) if party.name() == "central"
        ));
        assert!(matches!(
            Role::resolve(&settings, "central").unwrap(),
            Role::Coordinator(_)
        ));
        assert_eq!(Role::resolve(&settings, "alice").unwrap().party().name(), "alice");

        let err = Role::resolve(&settings, "bob").unwrap_err();
        assert!(matches!(err, ConfigErr::UnknownRole(role) if role == "bob"));
    }
}
