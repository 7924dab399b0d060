//! Properties of the selective upgrade engine, driven by in-memory resolvers.

use ripenv_upgrade::pipfile::{Category, Pipfile, PipfileLock, PipfilePackage};
use ripenv_upgrade::requirement::PackageSpec;
use ripenv_upgrade::resolver::ResolverEnvironment;
use ripenv_upgrade::upgrade::{UpgradeError, UpgradeOutcome, UpgradeRequest, upgrade};

use crate::common::{IndexResolver, ResolveCall, ScriptedResolver, name, pins};

const PIPFILE: &str = r#"
[[source]]
name = "pypi"
url = "https://pypi.org/simple"
verify_ssl = true

[packages]
requests = "*"
httpx = "*"

[dev-packages]
pytest = "*"
"#;

fn manifest() -> Pipfile {
    toml::from_str(PIPFILE).unwrap()
}

/// A lock where every package is pinned to an old release.
fn stale_lock() -> PipfileLock {
    let mut lock = PipfileLock::default();
    lock.default = pins(&[
        ("certifi", "2020.1.1"),
        ("httpx", "0.20.0"),
        ("idna", "2.0"),
        ("requests", "2.20.0"),
        ("urllib3", "1.26.0"),
    ]);
    lock.develop = pins(&[("iniconfig", "1.0.0"), ("pytest", "7.0.0")]);
    lock
}

fn request(specs: &[&str], categories: &[Category]) -> UpgradeRequest {
    UpgradeRequest {
        specs: specs.iter().map(|spec| PackageSpec::plain(*spec)).collect(),
        categories: categories.to_vec(),
        index: None,
    }
}

fn run(
    pipfile: &mut Pipfile,
    lock: &mut PipfileLock,
    request: &UpgradeRequest,
    resolver: &IndexResolver,
) -> UpgradeOutcome {
    upgrade(
        pipfile,
        lock,
        request,
        resolver,
        &ResolverEnvironment::default(),
    )
    .unwrap()
}

#[test]
fn only_targeted_names_change() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());

    let outcome = run(
        &mut pipfile,
        &mut lock,
        &request(&["requests"], &[Category::Packages]),
        &resolver,
    );

    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            changes: vec![(
                Category::Packages,
                vec![name("idna"), name("requests"), name("urllib3")]
            )]
        }
    );
    // httpx and certifi would move in a full relock, but were not targeted.
    assert_eq!(lock.default[&name("httpx")].version.as_deref(), Some("==0.20.0"));
    assert_eq!(lock.default[&name("certifi")].version.as_deref(), Some("==2020.1.1"));
    assert_eq!(lock.default[&name("requests")].version.as_deref(), Some("==2.31.0"));
    assert_eq!(lock.default[&name("urllib3")].version.as_deref(), Some("==2.0.7"));
}

#[test]
fn merged_values_come_from_the_full_resolve() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());

    run(
        &mut pipfile,
        &mut lock,
        &request(&["requests"], &[Category::Packages]),
        &resolver,
    );

    // Resolved alone, requests pulls idna 3.6; together with httpx the
    // category settles on idna 3.4, and that is what gets locked.
    assert_eq!(lock.default[&name("idna")].version.as_deref(), Some("==3.4"));
    assert_eq!(
        resolver.calls(),
        [
            ResolveCall {
                category: Category::Packages,
                requested: vec!["requests".to_owned()],
            },
            ResolveCall {
                category: Category::Packages,
                requested: vec!["requests".to_owned(), "httpx".to_owned()],
            },
        ]
    );
}

#[test]
fn other_categories_are_untouched() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());
    let before = lock.clone();

    run(
        &mut pipfile,
        &mut lock,
        &request(&["pytest"], &[Category::DevPackages]),
        &resolver,
    );

    assert_eq!(lock.default, before.default);
    assert_eq!(lock.develop, pins(&[("iniconfig", "2.0.0"), ("pytest", "8.0.0")]));
    assert_eq!(pipfile.packages, manifest().packages);
}

#[test]
fn repeating_an_upgrade_is_a_no_op() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());
    let request = request(&["requests==2.31.0"], &[Category::Packages]);

    run(&mut pipfile, &mut lock, &request, &resolver);
    let (first_pipfile, first_lock) = (pipfile.clone(), lock.clone());

    run(&mut pipfile, &mut lock, &request, &resolver);
    assert_eq!(pipfile, first_pipfile);
    assert_eq!(lock, first_lock);
}

#[test]
fn requested_entry_is_recorded_in_place() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());

    run(
        &mut pipfile,
        &mut lock,
        &request(&["Requests==2.31.0", "flask"], &[Category::Packages]),
        &resolver,
    );

    let keys: Vec<_> = pipfile.packages.keys().map(String::as_str).collect();
    assert_eq!(keys, ["requests", "httpx", "flask"]);
    assert_eq!(
        pipfile.packages["requests"],
        PipfilePackage::Simple("==2.31.0".to_owned())
    );
    assert!(lock.is_current_for(&pipfile));
    assert!(lock.default.contains_key(&name("werkzeug")));
}

#[test]
fn empty_request_touches_nothing() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());
    let before = (pipfile.clone(), lock.clone());

    let err = upgrade(
        &mut pipfile,
        &mut lock,
        &request(&[], &[Category::Packages]),
        &resolver,
        &ResolverEnvironment::default(),
    )
    .unwrap_err();

    assert!(matches!(err, UpgradeError::EmptyUpgradeRequest { .. }));
    assert!(resolver.calls().is_empty());
    assert_eq!((pipfile, lock), before);
}

#[test]
fn unknown_package_fails_the_category() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());

    let err = upgrade(
        &mut pipfile,
        &mut lock,
        &request(&["no-such-package"], &[Category::Packages]),
        &resolver,
        &ResolverEnvironment::default(),
    )
    .unwrap_err();

    let UpgradeError::ResolutionFailed {
        category, packages, ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(*category, Category::Packages);
    assert_eq!(packages, &["no-such-package"]);
    assert_eq!(lock, stale_lock());
}

/// `requests==2.31.0` against a manifest holding only `requests = "*"`.
#[test]
fn worked_example_leaves_certifi_alone() {
    let resolver = ScriptedResolver::new(vec![
        pins(&[("requests", "2.31.0"), ("urllib3", "2.0.7")]),
        pins(&[
            ("certifi", "2024.2.2"),
            ("requests", "2.31.0"),
            ("urllib3", "2.0.7"),
        ]),
    ]);
    let mut pipfile: Pipfile = toml::from_str("[packages]\nrequests = \"*\"\n").unwrap();

    // Never locked before: certifi stays absent.
    let mut lock = PipfileLock::default();
    upgrade(
        &mut pipfile,
        &mut lock,
        &request(&["requests==2.31.0"], &[Category::Packages]),
        &resolver,
        &ResolverEnvironment::default(),
    )
    .unwrap();
    assert_eq!(
        lock.default,
        pins(&[("requests", "2.31.0"), ("urllib3", "2.0.7")])
    );
    assert!(lock.develop.is_empty());

    // Previously locked: certifi keeps its old pin.
    let resolver = ScriptedResolver::new(vec![
        pins(&[("requests", "2.31.0"), ("urllib3", "2.0.7")]),
        pins(&[
            ("certifi", "2024.2.2"),
            ("requests", "2.31.0"),
            ("urllib3", "2.0.7"),
        ]),
    ]);
    let mut lock = PipfileLock::default();
    lock.default = pins(&[("certifi", "2023.7.22"), ("requests", "2.28.0")]);
    upgrade(
        &mut pipfile,
        &mut lock,
        &request(&["requests==2.31.0"], &[Category::Packages]),
        &resolver,
        &ResolverEnvironment::default(),
    )
    .unwrap();
    assert_eq!(
        lock.default,
        pins(&[
            ("certifi", "2023.7.22"),
            ("requests", "2.31.0"),
            ("urllib3", "2.0.7"),
        ])
    );
}

#[test]
fn empty_targeted_resolve_is_nothing_to_upgrade() {
    let resolver = ScriptedResolver::default();
    let mut pipfile = manifest();
    let mut lock = stale_lock();

    let outcome = upgrade(
        &mut pipfile,
        &mut lock,
        &request(&["requests"], &[Category::Packages, Category::DevPackages]),
        &resolver,
        &ResolverEnvironment::default(),
    )
    .unwrap();

    assert_eq!(outcome, UpgradeOutcome::NothingToUpgrade);
    assert_eq!(resolver.calls().len(), 1);
    assert_eq!(lock, stale_lock());
}

#[test]
fn categories_are_processed_in_caller_order() {
    let resolver = IndexResolver::new();
    let (mut pipfile, mut lock) = (manifest(), stale_lock());

    run(
        &mut pipfile,
        &mut lock,
        &request(&["pytest"], &[Category::DevPackages, Category::Packages]),
        &resolver,
    );

    let categories: Vec<_> = resolver.calls().iter().map(|call| call.category).collect();
    assert_eq!(
        categories,
        [
            Category::DevPackages,
            Category::DevPackages,
            Category::Packages,
            Category::Packages,
        ]
    );
    assert!(pipfile.packages.contains_key("pytest"));
    assert!(pipfile.dev_packages.contains_key("pytest"));
}
