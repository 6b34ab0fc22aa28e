//! Idempotent upsert of this service into the platform catalog.

use tracing::info;

use crate::client::PlatformClient;
use crate::error::PlatformResult;
use crate::model::{PlatformTarget, ServiceDescriptor};

/// What [`manage_registration`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new registration was created.
    Registered {
        /// Identifier assigned by the catalog, when reported.
        service_id: Option<String>,
    },
    /// An existing registration was replaced.
    Updated {
        /// Identifier of the replaced registration.
        service_id: String,
    },
}

/// Register the service, or update it when one with the same name already exists.
///
/// # Errors
///
/// Propagates lookup, create, and update failures from the client.
pub async fn manage_registration(
    client: &dyn PlatformClient,
    target: &PlatformTarget,
    descriptor: &ServiceDescriptor,
) -> PlatformResult<RegistrationOutcome> {
    let name = descriptor.resource_metadata.name.as_str();
    info!(service = name, "searching platform service list");
    match client.find_service(target, name).await? {
        Some(service_id) => {
            info!(service = name, service_id = %service_id, "updating service registration");
            client.update_service(target, &service_id, descriptor).await?;
            Ok(RegistrationOutcome::Updated { service_id })
        }
        None => {
            info!(service = name, "registering service");
            let service_id = client.register_service(target, descriptor).await?;
            Ok(RegistrationOutcome::Registered { service_id })
        }
    }
}
