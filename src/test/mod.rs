//! Fixtures shared by the unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    config::Configuration,
    dispatch::{ClassId, ObjectRef, PlatformObject},
    environment::Application,
    Error, Result,
};

/// Class name of [`TestView`].
pub const VIEW_CLASS: &str = "android.view.View";

/// Minimal platform object.
#[derive(Debug, Default)]
pub struct TestView {
    pub id: i32,
}

impl TestView {
    pub fn with_id(id: i32) -> Self {
        Self { id }
    }
}

impl PlatformObject for TestView {
    fn class_id(&self) -> ClassId {
        ClassId::new(VIEW_CLASS)
    }
}

/// A fresh [`TestView`] behind an [`ObjectRef`].
pub fn view() -> ObjectRef {
    Arc::new(TestView::default())
}

/// Shadow state counting handler invocations.
#[derive(Debug, Default)]
pub struct CountingShadow {
    pub calls: AtomicUsize,
}

/// Application recording its lifecycle callbacks.
#[derive(Debug, Default)]
pub struct RecordingApp {
    pub created: AtomicUsize,
    pub configuration_changes: AtomicUsize,
    pub terminated: AtomicUsize,
    fail_on_create: bool,
}

impl RecordingApp {
    /// An application whose `on_create` fails.
    pub fn failing() -> Self {
        Self {
            fail_on_create: true,
            ..Default::default()
        }
    }
}

impl Application for RecordingApp {
    fn on_create(&self) -> Result<()> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_create {
            return Err(Error::InvalidState("on_create failed".to_string()));
        }
        Ok(())
    }

    fn on_configuration_changed(&self, _configuration: &Configuration) {
        self.configuration_changes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_terminate(&self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}
