//! Content-type keyed dispatch table.
//!
//! The registry holds handler identifiers only. Live handlers are owned by
//! the executor and looked up when a job runs.

use indexmap::IndexMap;

use super::WatchError;
use super::content_type::{ContentType, TypeResolver};
use super::event::{ChangeEvent, ChangeKind};
use super::executor::JobSink;
use super::handler::{HandlerId, Job};

/// What happened to an event handed to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Routed to the deletion reaction.
    Deletion,
    /// Submitted to this many handlers.
    Submitted(usize),
    /// Resolved tag is not a supported type.
    Unsupported(ContentType),
    /// Supported tag with no handlers configured.
    Unregistered(ContentType),
}

/// Ordered tag → handler-id table, immutable after construction.
#[derive(Debug, Clone)]
pub struct DispatchRegistry {
    routes: IndexMap<ContentType, Vec<HandlerId>>,
}

impl DispatchRegistry {
    /// Build a registry from routes, checking every id against `known`.
    pub fn from_routes(
        routes: IndexMap<ContentType, Vec<HandlerId>>,
        known: &[HandlerId],
    ) -> Result<Self, WatchError> {
        for (tag, ids) in &routes {
            if let Some(unknown) = ids.iter().find(|id| !known.contains(id)) {
                return Err(WatchError::Config {
                    reason: format!("route '{tag}' names unknown handler '{unknown}'"),
                });
            }
        }

        Ok(Self { routes })
    }

    /// Handlers registered for `tag`, in registration order.
    pub fn handlers_for(&self, tag: &ContentType) -> Option<&[HandlerId]> {
        self.routes
            .get(tag)
            .map(Vec::as_slice)
            .filter(|ids| !ids.is_empty())
    }

    pub fn routes(&self) -> impl Iterator<Item = (&ContentType, &[HandlerId])> {
        self.routes.iter().map(|(tag, ids)| (tag, ids.as_slice()))
    }

    /// Route one event to the executor.
    ///
    /// Deletions skip type resolution since the file is gone. Unsupported
    /// and unregistered types are logged and dropped.
    pub fn dispatch(
        &self,
        event: &ChangeEvent,
        resolver: &TypeResolver,
        sink: &dyn JobSink,
    ) -> DispatchOutcome {
        if event.kind == ChangeKind::Deleted {
            sink.submit(Job::new(HandlerId::DELETION, event.kind, &event.path));
            return DispatchOutcome::Deletion;
        }

        let tag = resolver.resolve(&event.path);

        if !tag.is_supported() {
            tracing::warn!(
                "[dispatch] unsupported file type: '{}' with MIME type '{tag}'",
                event.path.display()
            );
            return DispatchOutcome::Unsupported(tag);
        }

        let Some(handlers) = self.handlers_for(&tag) else {
            tracing::warn!(
                "[dispatch] no handler for MIME type '{tag}': '{}'",
                event.path.display()
            );
            return DispatchOutcome::Unregistered(tag);
        };

        crate::log_event!("dispatch", "valid file type", "'{}' as '{tag}'", event.path.display());

        for id in handlers {
            crate::debug_event!("dispatch", "submitting", "{id} for {}", event.path.display());
            sink.submit(Job::new(id.clone(), event.kind, &event.path));
        }

        DispatchOutcome::Submitted(handlers.len())
    }
}

/// Routing used when the configuration doesn't override it.
pub fn default_routes() -> IndexMap<ContentType, Vec<HandlerId>> {
    IndexMap::from([
        (ContentType::new(ContentType::JPEG), vec![HandlerId::JPEG]),
        (ContentType::new(ContentType::JSON), vec![HandlerId::JSON]),
        (ContentType::new(ContentType::JSON_LD), vec![HandlerId::JSON]),
        (ContentType::new(ContentType::TEXT), vec![HandlerId::TEXT]),
        (ContentType::new(ContentType::ZIP), vec![HandlerId::ZIP]),
        (
            ContentType::new(ContentType::ZIP_COMPRESSED),
            vec![HandlerId::ZIP],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        jobs: Mutex<Vec<Job>>,
    }

    impl JobSink for RecordingSink {
        fn submit(&self, job: Job) {
            self.jobs.lock().unwrap().push(job);
        }
    }

    fn known() -> Vec<HandlerId> {
        vec![
            HandlerId::JPEG,
            HandlerId::JSON,
            HandlerId::TEXT,
            HandlerId::ZIP,
            HandlerId::DELETION,
        ]
    }

    #[test]
    fn test_default_routes_cover_supported_types() {
        let registry = DispatchRegistry::from_routes(default_routes(), &known()).unwrap();

        for tag in ContentType::SUPPORTED {
            assert!(registry.handlers_for(&ContentType::new(tag)).is_some(), "{tag}");
        }
        assert!(registry.handlers_for(&ContentType::empty()).is_none());
    }

    #[test]
    fn test_unknown_handler_rejected() {
        let mut routes = default_routes();
        routes.insert(ContentType::new("text/plain"), vec![HandlerId::new("shout")]);

        let err = DispatchRegistry::from_routes(routes, &known()).unwrap_err();
        assert!(err.to_string().contains("shout"));
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        let mut routes = IndexMap::new();
        routes.insert(
            ContentType::new(ContentType::TEXT),
            vec![HandlerId::TEXT, HandlerId::JSON],
        );
        let registry = DispatchRegistry::from_routes(routes, &known()).unwrap();
        let sink = RecordingSink::default();

        let outcome = registry.dispatch(&ChangeEvent::created(&path), &TypeResolver::new(), &sink);

        assert_eq!(outcome, DispatchOutcome::Submitted(2));
        let jobs = sink.jobs.lock().unwrap();
        assert_eq!(jobs[0].handler, HandlerId::TEXT);
        assert_eq!(jobs[1].handler, HandlerId::JSON);
        assert!(jobs.iter().all(|j| j.kind == ChangeKind::Created));
    }

    #[test]
    fn test_deletion_bypasses_resolution() {
        let registry = DispatchRegistry::from_routes(default_routes(), &known()).unwrap();
        let sink = RecordingSink::default();

        let outcome = registry.dispatch(
            &ChangeEvent::deleted("/gone/whatever.bin"),
            &TypeResolver::new(),
            &sink,
        );

        assert_eq!(outcome, DispatchOutcome::Deletion);
        let jobs = sink.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].handler, HandlerId::DELETION);
    }

    #[test]
    fn test_unsupported_type_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.bin");
        fs::write(&path, [0x00, 0x9F, 0x92]).unwrap();

        let registry = DispatchRegistry::from_routes(default_routes(), &known()).unwrap();
        let sink = RecordingSink::default();

        let outcome = registry.dispatch(&ChangeEvent::created(&path), &TypeResolver::new(), &sink);

        assert!(matches!(outcome, DispatchOutcome::Unsupported(_)));
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unregistered_type_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let mut routes = default_routes();
        routes.shift_remove(&ContentType::new(ContentType::JPEG));
        let registry = DispatchRegistry::from_routes(routes, &known()).unwrap();
        let sink = RecordingSink::default();

        let outcome = registry.dispatch(&ChangeEvent::modified(&path), &TypeResolver::new(), &sink);

        assert_eq!(
            outcome,
            DispatchOutcome::Unregistered(ContentType::new(ContentType::JPEG))
        );
        assert!(sink.jobs.lock().unwrap().is_empty());
    }
}
