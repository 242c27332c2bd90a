//! Diesel schema for the directory tables read by this crate.

diesel::table! {
    /// Platform users.
    users (id) {
        /// User identifier.
        id -> Uuid,
        /// Human-readable name.
        #[max_length = 100]
        display_name -> Varchar,
        /// Role name.
        #[max_length = 20]
        role -> Varchar,
        /// Owning organization.
        org_id -> Nullable<Uuid>,
        /// Creation timestamp, used for stable member ordering.
        created_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Organization hierarchy nodes.
    organizations (id) {
        /// Organization identifier.
        id -> Uuid,
        /// Organization name.
        #[max_length = 100]
        name -> Varchar,
        /// Parent organization.
        parent_id -> Nullable<Uuid>,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}
