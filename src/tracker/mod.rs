mod clock;
mod error;
mod notifier;
mod session;

pub use clock::TimeUnit;
pub use error::{ShiftOutOfRange, TrackerError};
pub use notifier::{ConsoleNotifier, DesktopNotifier, Notify};
pub use session::{PassOutlook, SessionSnapshot, TrackedObject, TrackingSession};
