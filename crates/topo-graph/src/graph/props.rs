//! Well-known property keys

/// Vertex property keys
pub mod vertex {
    /// Entity category, e.g. `RESOURCE` or `ALARM`
    pub const CATEGORY: &str = "category";
    /// Entity type within its category
    pub const TYPE: &str = "type";
    /// Datasource-level identifier
    pub const ID: &str = "id";
    /// Display name
    pub const NAME: &str = "name";
    /// Operational state
    pub const STATE: &str = "state";
    /// Soft delete flag
    pub const IS_DELETED: &str = "is_deleted";
    /// Forward-referenced, not yet confirmed by its own datasource
    pub const IS_PLACEHOLDER: &str = "is_placeholder";
    /// Last update time
    pub const UPDATE_TIMESTAMP: &str = "update_timestamp";
}

/// Edge property keys
pub mod edge {
    /// Copy of the edge label
    pub const RELATIONSHIP_TYPE: &str = "relationship_type";
    /// Soft delete flag
    pub const IS_DELETED: &str = "is_deleted";
    /// Last update time
    pub const UPDATE_TIMESTAMP: &str = "update_timestamp";
}

/// Common relationship labels
pub mod relationship {
    #[allow(missing_docs)]
    pub const CONTAINS: &str = "contains";
    #[allow(missing_docs)]
    pub const ON: &str = "on";
    #[allow(missing_docs)]
    pub const ATTACHED: &str = "attached";
    #[allow(missing_docs)]
    pub const CAUSES: &str = "causes";
}
