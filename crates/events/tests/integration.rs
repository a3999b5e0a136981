//! Integration tests for events

#[cfg(test)]
mod tests {
    use relup_errors::DownloadError;
    use relup_events::*;
    use relup_types::{TerminalState, UpdatePhase};

    #[tokio::test]
    async fn test_event_sender_emit_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_warning_with_context("store unavailable", "disk full");
        tx.emit_download_progress(7, 50, Some(100));

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            event1,
            AppEvent::General(GeneralEvent::Warning {
                context: Some(_),
                ..
            })
        ));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::Download(DownloadEvent::Progress {
                id: 7,
                bytes_so_far: 50,
                bytes_total: Some(100)
            })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_absent_sender_is_silent() {
        let emitter: Option<EventSender> = None;
        emitter.emit_warning("nobody listening");
    }

    #[test]
    fn test_failure_context_from_error() {
        let err = DownloadError::InvalidArtifact {
            expected: 10,
            actual: 9,
        };
        let ctx = FailureContext::from_error(&err);
        assert_eq!(ctx.message, "The file is invalid");
        assert_eq!(ctx.code.as_deref(), Some("download.invalid_artifact"));
        assert!(!ctx.retryable);
    }

    #[test]
    fn test_log_levels() {
        let failed = AppEvent::Download(DownloadEvent::Failed {
            id: Some(1),
            failure: FailureContext::new(None::<String>, "boom", None::<String>, false),
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
        assert_eq!(failed.log_target(), "relup::events::download");

        let progress = AppEvent::Download(DownloadEvent::Progress {
            id: 1,
            bytes_so_far: 0,
            bytes_total: None,
        });
        assert_eq!(progress.log_level(), tracing::Level::DEBUG);

        let cancelled = AppEvent::Update(UpdateEvent::Cancelled {
            version: "1.0.0".into(),
        });
        assert_eq!(cancelled.log_level(), tracing::Level::WARN);
        assert_eq!(cancelled.event_source(), EventSource::UPDATE);
    }

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::Update(UpdateEvent::PhaseChanged {
            version: "1.2.0".into(),
            from: UpdatePhase::Installing,
            to: UpdatePhase::Terminal(TerminalState::Succeeded),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "update");
        assert_eq!(json["event"]["type"], "PhaseChanged");
    }
}
