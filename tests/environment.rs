//! Integration tests for the environment lifecycle.

use shadowhost::{
    config::{Configuration, ResourceTable},
    environment::{
        AppManifest, Application, EnvironmentBuilder, EnvironmentConfig, Manifest, MetaData,
        RuntimeContext, TestEnvironment,
    },
    scheduler::QueueName,
    Error, Result,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

#[derive(Default)]
struct LifecycleApp {
    created: AtomicUsize,
    changed: AtomicUsize,
    terminated: AtomicUsize,
}

impl Application for LifecycleApp {
    fn on_create(&self) -> Result<()> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_configuration_changed(&self, _configuration: &Configuration) {
        self.changed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_terminate(&self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct ThrowingManifest;

impl Manifest for ThrowingManifest {
    fn package_name(&self) -> &str {
        "org.shadowhost.throwing"
    }

    fn init_meta_data(&self, _resources: &ResourceTable, config: &Configuration) -> Result<MetaData> {
        Err(Error::ResourceNotFound {
            kind: "string".to_string(),
            name: "api_key".to_string(),
            qualifiers: config.qualifier_string(),
        })
    }
}

fn environment() -> TestEnvironment {
    EnvironmentBuilder::new().build().unwrap()
}

#[test]
fn test_storage_directories_exist() -> Result<()> {
    let env = environment();
    env.set_up_application_state()?;

    let info = env.application_info()?;
    assert!(info.source_dir.is_dir());
    assert!(info.public_source_dir.is_dir());
    assert!(info.data_dir.is_dir());
    assert!(info.credential_protected_data_dir.as_ref().unwrap().is_dir());
    assert!(info.device_protected_data_dir.as_ref().unwrap().is_dir());

    env.tear_down_application();
    assert!(!info.data_dir.exists());
    Ok(())
}

#[test]
fn test_storage_before_n_has_no_protected_dirs() -> Result<()> {
    let env = EnvironmentBuilder::new().api_level(23).build()?;
    env.set_up_application_state()?;

    let info = env.application_info()?;
    assert!(info.data_dir.is_dir());
    assert!(info.credential_protected_data_dir.is_none());
    assert!(info.device_protected_data_dir.is_none());

    env.tear_down_application();
    Ok(())
}

#[test]
fn test_explicit_storage_root() -> Result<()> {
    let root = tempfile::tempdir()?;
    let env = EnvironmentBuilder::new().storage_root(root.path()).build()?;
    env.set_up_application_state()?;

    let info = env.application_info()?;
    assert!(info.data_dir.starts_with(root.path()));
    env.tear_down_application();
    Ok(())
}

#[test]
fn test_on_terminate_runs_once() -> Result<()> {
    let app = Arc::new(LifecycleApp::default());
    let env = environment();
    env.set_application(app.clone());

    env.set_up_application_state()?;
    assert_eq!(app.created.load(Ordering::SeqCst), 1);

    env.tear_down_application();
    env.tear_down_application();
    assert_eq!(app.terminated.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_directly_installed_application_is_terminated() {
    let app = Arc::new(LifecycleApp::default());
    let env = environment();
    env.set_application(app.clone());

    env.tear_down_application();
    assert_eq!(app.terminated.load(Ordering::SeqCst), 1);
    assert_eq!(app.created.load(Ordering::SeqCst), 0);
}

#[test]
fn test_tear_down_without_set_up_is_safe() {
    let env = environment();
    env.tear_down_application();
    assert!(!env.is_set_up());
}

#[test]
fn test_throwing_manifest_fails_set_up() {
    let env = EnvironmentBuilder::new()
        .manifest(ThrowingManifest)
        .build()
        .unwrap();

    let err = env.set_up_application_state().unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound { .. }));
    assert!(!env.is_set_up());
    assert!(!env.is_main_thread());

    env.tear_down_application();
    assert!(env.set_up_application_state().is_err());
}

#[test]
fn test_manifest_meta_data_resolves_references() -> Result<()> {
    let mut resources = ResourceTable::new();
    resources.add("string", "maps_key", "", "key-default")?;
    resources.add("string", "maps_key", "fr", "key-fr")?;

    let env = EnvironmentBuilder::new()
        .qualifiers("fr-rFR")
        .resources(resources)
        .manifest(
            AppManifest::new("com.example.maps")
                .with_application_class("com.example.maps.MapsApp")
                .with_meta_data("com.google.maps.API_KEY", "@string/maps_key"),
        )
        .build()?;
    env.set_up_application_state()?;

    let info = env.application_info()?;
    assert_eq!(info.package_name, "com.example.maps");
    assert_eq!(info.class_name.as_deref(), Some("com.example.maps.MapsApp"));
    assert_eq!(info.meta_data["com.google.maps.API_KEY"], "key-fr");
    assert_eq!(env.get_resource("string", "maps_key")?, "key-fr");

    env.tear_down_application();
    Ok(())
}

#[test]
fn test_main_thread_follows_set_up_thread() -> Result<()> {
    let env = Arc::new(environment());

    let worker_env = Arc::clone(&env);
    let (before, after) = thread::spawn(move || {
        let before = worker_env.is_main_thread();
        worker_env.set_up_application_state().unwrap();
        (before, worker_env.is_main_thread())
    })
    .join()
    .unwrap();

    assert!(!before);
    assert!(after);
    assert!(!env.is_main_thread());

    env.set_main_thread(thread::current().id());
    assert!(env.is_main_thread());

    env.tear_down_application();
    Ok(())
}

#[test]
fn test_tear_down_from_background_thread() -> Result<()> {
    let app = Arc::new(LifecycleApp::default());
    let env = Arc::new(environment());
    env.set_application(app.clone());
    env.set_up_application_state()?;

    let worker_env = Arc::clone(&env);
    thread::spawn(move || worker_env.tear_down_application())
        .join()
        .unwrap();

    assert_eq!(app.terminated.load(Ordering::SeqCst), 1);
    assert!(!env.is_set_up());
    Ok(())
}

#[test]
fn test_set_qualifiers_notifies_and_updates() -> Result<()> {
    let app = Arc::new(LifecycleApp::default());
    let env = EnvironmentBuilder::new().qualifiers("w123dp-h456dp").build()?;
    env.set_application(app.clone());
    env.set_up_application_state()?;

    env.set_qualifiers("+w124dp")?;
    assert!(env.qualifiers()?.contains("w124dp-h456dp"));

    env.set_qualifiers("land")?;
    let qualifiers = env.qualifiers()?;
    assert!(qualifiers.contains("w470dp-h320dp"));
    assert!(qualifiers.contains("-land-"));
    assert_eq!(app.changed.load(Ordering::SeqCst), 2);

    assert_eq!(env.default_locale()?.language, "en");
    assert_eq!(env.display_metrics()?.width_pixels, 470);

    env.tear_down_application();
    Ok(())
}

#[test]
fn test_global_scheduler_setting() -> Result<()> {
    let env = EnvironmentBuilder::new()
        .config(EnvironmentConfig::global_scheduler())
        .build()?;
    env.set_up_application_state()?;

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let schedulers = env.schedulers()?;
    schedulers.post(QueueName::Background, 0, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(env.idle_main_looper()?, 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    env.set_use_global_scheduler(false);
    let counter = Arc::clone(&ran);
    env.schedulers()?.post(QueueName::Background, 0, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(env.idle_main_looper()?, 0);
    assert_eq!(env.schedulers()?.advance_by(QueueName::Background, 0), 1);

    env.tear_down_application();
    Ok(())
}

#[test]
fn test_enabling_global_scheduler_keeps_background_work() -> Result<()> {
    let env = environment();
    env.set_up_application_state()?;

    let ran = Arc::new(AtomicUsize::new(0));
    let earlier = env.schedulers()?;
    let counter = Arc::clone(&ran);
    earlier.post(QueueName::Background, 10, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    env.set_use_global_scheduler(true);
    assert!(earlier.is_global());
    assert_eq!(env.master_scheduler()?.size(), 1);

    let counter = Arc::clone(&ran);
    earlier.post(QueueName::Background, 0, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(env.idle_main_looper()?, 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    assert_eq!(env.schedulers()?.advance_by(QueueName::Foreground, 10), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 2);
    assert_eq!(env.schedulers()?.advance_by(QueueName::Background, 1_000), 0);

    env.tear_down_application();
    Ok(())
}

#[test]
fn test_tear_down_drops_pending_work() -> Result<()> {
    let env = environment();
    env.set_up_application_state()?;
    let master = env.master_scheduler()?;
    master.post_delayed(1_000, || {});
    assert_eq!(master.size(), 1);

    env.tear_down_application();
    assert_eq!(master.size(), 0);
    assert!(matches!(env.master_scheduler(), Err(Error::InvalidState(_))));
    Ok(())
}

#[test]
fn test_application_factory_sees_context() -> Result<()> {
    let seen = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&seen);
    let env = EnvironmentBuilder::new()
        .application(move |context: &RuntimeContext| {
            observed.store(context.application_info().target_sdk_version as usize, Ordering::SeqCst);
            Ok(LifecycleApp::default())
        })
        .build()?;

    env.set_up_application_state()?;
    assert_eq!(seen.load(Ordering::SeqCst), 28);
    env.tear_down_application();
    Ok(())
}
