//! Diesel schema for workflow persistence.

diesel::table! {
    /// Workflow definitions.
    workflows (id) {
        /// Definition identifier.
        id -> Uuid,
        /// Display name.
        #[max_length = 100]
        name -> Varchar,
        /// Code, unique among live definitions.
        #[max_length = 50]
        code -> Varchar,
        /// Free-form type tag.
        #[max_length = 30]
        workflow_type -> Varchar,
        /// Long description.
        description -> Text,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Structural version counter.
        version -> Int4,
        /// Default flag for the type tag.
        is_default -> Bool,
        /// Creating user.
        creator_id -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Ordered steps of each definition.
    workflow_steps (id) {
        /// Step identifier.
        id -> Uuid,
        /// Owning definition.
        workflow_id -> Uuid,
        /// Step name.
        #[max_length = 100]
        name -> Varchar,
        /// Long description.
        description -> Text,
        /// Order index within the definition.
        step_order -> Int4,
        /// Free-form step type tag.
        #[max_length = 30]
        step_type -> Varchar,
        /// Assignee resolution mode.
        #[max_length = 30]
        assignee_mode -> Varchar,
        /// Target role for role resolution.
        #[max_length = 30]
        assignee_role -> Nullable<Varchar>,
        /// Expected duration in hours.
        duration_hours -> Int4,
        /// Skip the step when it times out.
        skip_on_timeout -> Bool,
        /// Opaque form configuration.
        form_config -> Jsonb,
        /// Opaque transition conditions.
        conditions -> Jsonb,
        /// Opaque available actions.
        actions -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Running and terminated workflow instances.
    workflow_instances (id) {
        /// Instance identifier.
        id -> Uuid,
        /// Executed definition.
        workflow_id -> Uuid,
        /// Bound business object.
        business_id -> Uuid,
        /// Business type tag.
        #[max_length = 30]
        business_type -> Varchar,
        /// Human-readable title.
        #[max_length = 200]
        title -> Varchar,
        /// Execution status.
        #[max_length = 20]
        status -> Varchar,
        /// Current step while running.
        current_step_id -> Nullable<Uuid>,
        /// Starting user.
        starter_id -> Uuid,
        /// Start time.
        start_time -> Timestamptz,
        /// End time once terminal.
        end_time -> Nullable<Timestamptz>,
        /// Time the current step was entered.
        step_entered_at -> Timestamptz,
        /// Optimistic concurrency revision.
        revision -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only transition history.
    workflow_histories (id) {
        /// Row identifier.
        id -> Uuid,
        /// Insertion sequence used for ordering.
        seq -> Int8,
        /// Owning instance.
        instance_id -> Uuid,
        /// Step acted on.
        step_id -> Uuid,
        /// Step name snapshot.
        #[max_length = 100]
        step_name -> Varchar,
        /// Operator.
        operator_id -> Uuid,
        /// Recorded action.
        #[max_length = 50]
        action -> Varchar,
        /// Operator comment.
        comment -> Text,
        /// Form-data snapshot.
        form_data -> Jsonb,
        /// Transfer target.
        transfer_to -> Nullable<Uuid>,
        /// Time the step was entered.
        start_time -> Timestamptz,
        /// Time the action was committed.
        end_time -> Timestamptz,
        /// Minutes spent on the step.
        duration_minutes -> Int8,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    workflows,
    workflow_steps,
    workflow_instances,
    workflow_histories,
);
