//! Integration tests for types

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use relup_types::*;

    fn intent() -> ConfirmationIntent {
        ConfirmationIntent {
            session: InstallSessionId::new(4),
            token: "confirm-4".into(),
            prompt: None,
        }
    }

    #[test]
    fn test_download_id_sentinel() {
        assert_eq!(DownloadId::from_persisted(DownloadId::INVALID), None);
        assert_eq!(DownloadId::from_persisted(42), Some(DownloadId::new(42)));
    }

    #[test]
    fn test_pending_user_action_requires_intent() {
        let outcome =
            InstallOutcome::from_status(InstallStatus::PENDING_USER_ACTION, None, Some(intent()));
        assert_eq!(outcome, InstallOutcome::ConfirmationRequired(intent()));
        assert!(!outcome.is_terminal());

        let outcome = InstallOutcome::from_status(InstallStatus::PENDING_USER_ACTION, None, None);
        assert!(matches!(
            outcome,
            InstallOutcome::Failure {
                kind: FailureKind::Invalid,
                ..
            }
        ));
    }

    #[test]
    fn test_failure_family_keeps_message() {
        let outcome = InstallOutcome::from_status(
            InstallStatus::FAILURE_STORAGE,
            Some("no space".into()),
            None,
        );
        assert_eq!(
            outcome,
            InstallOutcome::Failure {
                kind: FailureKind::Storage,
                message: "no space".into()
            }
        );
    }

    #[test]
    fn test_update_phase_transitions() {
        assert!(UpdatePhase::Idle.can_advance_to(UpdatePhase::Requesting));
        assert!(UpdatePhase::Idle.can_advance_to(UpdatePhase::Downloading));
        assert!(UpdatePhase::Downloading.can_advance_to(UpdatePhase::Installing));
        assert!(!UpdatePhase::Installing.can_advance_to(UpdatePhase::Downloading));
        assert!(UpdatePhase::Installing
            .can_advance_to(UpdatePhase::Terminal(TerminalState::Cancelled)));
        assert!(!UpdatePhase::Terminal(TerminalState::Succeeded)
            .can_advance_to(UpdatePhase::Terminal(TerminalState::Failed)));
    }

    #[test]
    fn test_signal_serialization() {
        let json = serde_json::to_string(&InstallerSignal::PackageReplaced).unwrap();
        assert_eq!(json, r#"{"signal":"package_replaced"}"#);
    }

    proptest! {
        #[test]
        fn codes_outside_known_set_are_unrecognized(code in any::<i32>().prop_filter("known", |c| !(-1..=7).contains(c))) {
            let outcome = InstallOutcome::from_status(InstallStatus(code), Some("m".into()), None);
            prop_assert_eq!(outcome, InstallOutcome::Unrecognized { code, message: "m".into() });
        }

        #[test]
        fn failure_codes_are_terminal_failures(code in 1i32..=7) {
            let outcome = InstallOutcome::from_status(InstallStatus(code), None, Some(intent()));
            prop_assert!(matches!(outcome, InstallOutcome::Failure { .. }), "expected failure for {}", code);
            prop_assert!(outcome.is_terminal());
        }
    }
}
