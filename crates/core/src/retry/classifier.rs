/// Classification of a failed remote call.
///
/// | Class | Retried by the executor? | Recovery path? |
/// |-------|--------------------------|----------------|
/// | `Transient` | Yes, up to the policy budget | No |
/// | `Precondition` | No | Yes, once, where the call site supplies an action |
/// | `Fatal` | No | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Expected to resolve itself if the same request is repeated after a short wait.
    Transient,

    /// A known dependency is missing (e.g. the user is not registered yet) and a
    /// specific corrective action can fix it.
    Precondition,

    /// Must propagate to the caller.
    Fatal,
}

/// Maps an error to an [`ErrorClass`]. Implementations must be pure.
pub trait Classify<E: ?Sized> {
    fn classify(&self, error: &E) -> ErrorClass;
}

impl<E: ?Sized, F> Classify<E> for F
where
    F: Fn(&E) -> ErrorClass,
{
    fn classify(&self, error: &E) -> ErrorClass {
        self(error)
    }
}

/// The HTTP shape of a service client error.
pub trait RemoteFailure {
    /// Status code of the response, if the request got that far.
    fn status_code(&self) -> Option<u16>;

    /// Whether the request failed with a connect or read timeout.
    fn is_timeout(&self) -> bool;
}

/// Server-side statuses that are retried everywhere.
pub const TRANSIENT_SERVER_STATUSES: [u16; 4] = [500, 502, 503, 504];

const FORBIDDEN: u16 = 403;

/// Status-code based classifier, configured per call site.
///
/// By default only timeouts and [`TRANSIENT_SERVER_STATUSES`] are transient and nothing
/// is a precondition.
///
/// ```
/// use terra_core::retry::{Classify, ErrorClass, HttpClassifier};
///
/// // Adding a member: a 400 means the email is not known to the service yet.
/// let classifier = HttpClassifier::new().precondition_on(400);
/// assert_eq!(classifier.precondition_status(), Some(400));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HttpClassifier {
    forbidden_is_transient: bool,
    precondition_status: Option<u16>,
}

impl HttpClassifier {
    pub const fn new() -> Self {
        Self {
            forbidden_is_transient: false,
            precondition_status: None,
        }
    }

    /// Retry 403 responses. Only for requests that follow a permission grant, while the
    /// grant propagates.
    pub const fn treat_forbidden_as_transient(mut self) -> Self {
        self.forbidden_is_transient = true;
        self
    }

    /// Report `status` as a missing precondition instead of a fatal error.
    pub const fn precondition_on(mut self, status: u16) -> Self {
        self.precondition_status = Some(status);
        self
    }

    pub const fn precondition_status(&self) -> Option<u16> {
        self.precondition_status
    }

    pub fn is_precondition<E: RemoteFailure + ?Sized>(&self, error: &E) -> bool {
        self.classify(error) == ErrorClass::Precondition
    }
}

impl<E: RemoteFailure + ?Sized> Classify<E> for HttpClassifier {
    fn classify(&self, error: &E) -> ErrorClass {
        if error.is_timeout() {
            return ErrorClass::Transient;
        }
        match error.status_code() {
            Some(code) if TRANSIENT_SERVER_STATUSES.contains(&code) => ErrorClass::Transient,
            Some(FORBIDDEN) if self.forbidden_is_transient => ErrorClass::Transient,
            Some(code) if self.precondition_status == Some(code) => ErrorClass::Precondition,
            _ => ErrorClass::Fatal,
        }
    }
}
