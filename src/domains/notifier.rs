use std::sync::Arc;

/// User-facing notification sink (toasts, banners, chat messages...).
pub trait Notifier: Send + Sync + 'static {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
    fn success(&self, message: &str);
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Fixed vocabulary of user-facing messages. Kept small so the throttle map stays bounded.
pub mod messages {
    pub const WORKER_NOT_FOUND: &str = "Worker not found";
    pub const ORDER_NOT_FOUND: &str = "Service order not found";
    pub const STORE_FAILURE: &str = "Could not update the assignment, please try again";
    pub const NOTHING_SELECTED: &str = "Select at least one worker";
    pub const NO_CONFIRM_HANDLER: &str = "Selection cannot be confirmed right now";
    pub const ASSIGNED: &str = "Worker assigned";
    pub const ASSIGNED_MANY: &str = "Workers assigned";
    pub const RELEASED: &str = "Worker released";
    pub const FORCE_RELEASED: &str = "Worker force-released";
}
