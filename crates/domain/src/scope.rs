use warden_core::OrganizationId;

/// Capability of resources that live inside exactly one organization.
///
/// Authorization checks against a resource derive their scope from this
/// method instead of inspecting optional ownership fields.
pub trait ScopedResource {
    /// Returns the organization that owns the resource.
    fn organization_id(&self) -> OrganizationId;
}

impl ScopedResource for OrganizationId {
    fn organization_id(&self) -> OrganizationId {
        *self
    }
}
