//! Per-request context passed explicitly through the pipeline.

use runwrap_config::ServiceProfile;
use runwrap_platform::PlatformTarget;

use crate::request::ExecutionRequest;

/// User recorded when the caller does not identify themselves.
pub const ANONYMOUS_USER: &str = "anon user";

/// Immutable context for one execution.
#[derive(Debug, Clone)]
pub struct Session {
    /// Name of this service instance.
    pub app_name: String,
    /// Identifier shared by the workspace and log records.
    pub session_id: String,
    /// Initiating user.
    pub user_id: String,
    /// Platform address, from the request or the service default.
    pub platform_addr: Option<String>,
    /// Platform credential, from the request or the service default.
    pub platform_auth: Option<String>,
    /// Whether audit records are emitted.
    pub audit: bool,
}

impl Session {
    /// Build the context for `request`, falling back to profile defaults.
    #[must_use]
    pub fn for_request(
        profile: &ServiceProfile,
        request: &ExecutionRequest,
        session_id: String,
    ) -> Self {
        let user_id = non_blank(&request.user_id).unwrap_or_else(|| ANONYMOUS_USER.to_string());
        Self {
            app_name: profile.config.app_name().to_string(),
            session_id,
            user_id,
            platform_addr: non_blank(&request.pz_addr).or_else(|| profile.platform_addr.clone()),
            platform_auth: non_blank(&request.pz_auth).or_else(|| profile.platform_auth.clone()),
            audit: profile.config.log_audit,
        }
    }

    /// Platform target when both address and credential are known.
    #[must_use]
    pub fn target(&self) -> Option<PlatformTarget> {
        match (&self.platform_addr, &self.platform_auth) {
            (Some(addr), Some(auth)) => Some(PlatformTarget::new(addr.as_str(), auth.as_str())),
            _ => None,
        }
    }

    /// Emit an audit record attributed to the initiating user.
    pub fn audit(&self, action: &str, actee: &str) {
        runwrap_telemetry::audit(self.audit, &self.user_id, action, actee);
    }

    /// Emit an audit record attributed to this service.
    pub fn audit_as_service(&self, action: &str, actee: &str) {
        runwrap_telemetry::audit(self.audit, &self.app_name, action, actee);
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runwrap_config::ServiceConfig;

    fn profile() -> Result<ServiceProfile, runwrap_config::ConfigError> {
        let config = ServiceConfig {
            svc_name: "gdal".to_string(),
            pz_addr: "https://default.pz".to_string(),
            log_audit: true,
            ..ServiceConfig::default()
        };
        ServiceProfile::resolve(config, &|_: &str| None)
    }

    #[test]
    fn request_values_override_profile_defaults() -> Result<(), runwrap_config::ConfigError> {
        let request = ExecutionRequest {
            pz_addr: "https://caller.pz".to_string(),
            pz_auth: "Basic abc".to_string(),
            user_id: "bob".to_string(),
            ..ExecutionRequest::default()
        };
        let session = Session::for_request(&profile()?, &request, "S-1".to_string());
        let target = session.target();
        assert_eq!(session.user_id, "bob");
        assert_eq!(session.app_name, "gdal");
        assert!(session.audit);
        assert_eq!(
            target,
            Some(PlatformTarget::new("https://caller.pz", "Basic abc"))
        );
        Ok(())
    }

    #[test]
    fn missing_credential_yields_no_target() -> Result<(), runwrap_config::ConfigError> {
        let session =
            Session::for_request(&profile()?, &ExecutionRequest::default(), "S-2".to_string());
        assert_eq!(session.user_id, ANONYMOUS_USER);
        assert_eq!(session.platform_addr.as_deref(), Some("https://default.pz"));
        assert!(session.target().is_none());
        Ok(())
    }
}
