//! Audit events.
//!
//! Audit lines go to the `audit` tracing target so operators can route them
//! separately with `RUST_LOG=audit=info`.

use crate::context::{current_request_id, current_route};

/// Emit an audit record when auditing is enabled.
///
/// `actor` is who acted, `action` is a short verb phrase, and `actee` is the
/// object acted upon (an identifier or file name). Records made while serving
/// an HTTP request carry its request id and route; others carry `-`.
pub fn audit(enabled: bool, actor: &str, action: &str, actee: &str) {
    if !enabled {
        return;
    }
    let request_id = current_request_id();
    let route = current_route();
    tracing::info!(
        target: "audit",
        actor,
        action,
        actee,
        request_id = request_id.as_deref().unwrap_or("-"),
        route = route.as_deref().unwrap_or("-"),
        "audit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::with_request_context;
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};
    use tracing::subscriber::DefaultGuard;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    fn capture() -> (Captured, DefaultGuard) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }

    #[test]
    fn disabled_audit_writes_nothing() {
        let (captured, _guard) = capture();
        audit(false, "runwrap", "runs", "gdalinfo");
        assert!(captured.text().is_empty());
    }

    #[tokio::test]
    async fn audit_carries_request_context() {
        let (captured, _guard) = capture();
        with_request_context("req-9", "/execute", async {
            audit(true, "anon user", "requests execution", "session-1");
        })
        .await;

        let line = captured.text();
        assert!(line.contains("\"target\":\"audit\""), "{line}");
        assert!(line.contains("\"actor\":\"anon user\""), "{line}");
        assert!(line.contains("\"actee\":\"session-1\""), "{line}");
        assert!(line.contains("\"request_id\":\"req-9\""), "{line}");
        assert!(line.contains("\"route\":\"/execute\""), "{line}");
    }

    #[test]
    fn audit_outside_a_request_marks_context_absent() {
        let (captured, _guard) = capture();
        audit(true, "runwrap", "registers", "ndvi");
        let line = captured.text();
        assert!(line.contains("\"request_id\":\"-\""), "{line}");
        assert!(line.contains("\"route\":\"-\""), "{line}");
    }
}
