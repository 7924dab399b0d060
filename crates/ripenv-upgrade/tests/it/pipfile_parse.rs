//! Fixture Pipfiles through the data model, the writer and the lock hash.

use ripenv_upgrade::pipfile::{
    Category, Pipfile, PipfileLock, PipfilePackage, PipfilePackageDetail,
};

use crate::common::fixture;

fn load(name: &str) -> Pipfile {
    Pipfile::from_path(&fixture(name)).unwrap_or_else(|err| panic!("{name}: {err:#}"))
}

fn detail<'a>(pipfile: &'a Pipfile, category: Category, key: &str) -> &'a PipfilePackageDetail {
    match pipfile.section(category).get(key) {
        Some(PipfilePackage::Detailed(detail)) => detail,
        other => panic!("expected a table entry for {key}, got {other:?}"),
    }
}

#[test]
fn minimal() {
    let pipfile = load("minimal");

    assert_eq!(pipfile.source.len(), 1);
    assert_eq!(pipfile.source[0].name, "pypi");
    assert!(pipfile.source[0].verify_ssl);
    assert_eq!(
        pipfile.section(Category::Packages).get("requests"),
        Some(&PipfilePackage::Simple("*".to_owned()))
    );
    assert!(pipfile.section(Category::DevPackages).is_empty());
    assert_eq!(
        pipfile.requires.and_then(|requires| requires.python_version).as_deref(),
        Some("3.12")
    );
}

#[test]
fn dev_packages_keep_file_order() {
    let pipfile = load("with-dev-deps");
    let keys: Vec<_> = pipfile
        .section(Category::DevPackages)
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["pytest", "pytest-cov"]);
    assert_eq!(
        pipfile.section(Category::Packages).get("requests").and_then(PipfilePackage::version),
        Some(">=2.31.0")
    );
}

#[test]
fn index_pinned_package() {
    let pipfile = load("multiple-sources");
    let names: Vec<_> = pipfile.source.iter().map(|source| source.name.as_str()).collect();
    assert_eq!(names, ["pypi", "private"]);
    assert_eq!(
        detail(&pipfile, Category::Packages, "internal-lib").index.as_deref(),
        Some("private")
    );
}

#[test]
fn vcs_and_editable() {
    let pipfile = load("vcs-and-editable");

    let git = detail(&pipfile, Category::Packages, "my-git-pkg");
    assert_eq!(
        git.git.as_deref(),
        Some("https://github.com/example/my-git-pkg.git")
    );
    assert_eq!(git.git_ref.as_deref(), Some("main"));
    assert!(!git.editable);

    let local = detail(&pipfile, Category::Packages, "my-local-pkg");
    assert!(local.editable);
    assert_eq!(local.path.as_deref(), Some("./local-pkg"));
}

#[test]
fn complex_specs() {
    let pipfile = load("complex-specs");

    let requests = detail(&pipfile, Category::Packages, "requests");
    assert_eq!(requests.version.as_deref(), Some(">=2.32.0"));
    assert_eq!(requests.extras, ["security"]);

    let stdeb = detail(&pipfile, Category::Packages, "stdeb");
    assert_eq!(stdeb.sys_platform.as_deref(), Some("== 'linux'"));

    let legacy_cgi = detail(&pipfile, Category::Packages, "legacy-cgi");
    assert_eq!(
        legacy_cgi.markers.as_deref(),
        Some("python_version >= '3.13'")
    );

    assert!(pipfile.section(Category::Packages).contains_key("zope.interface"));

    let pipenv = detail(&pipfile, Category::DevPackages, "pipenv");
    assert!(pipenv.editable);
    assert_eq!(pipenv.extras, ["tests", "dev"]);

    assert!(pipfile.allow_prereleases());
}

#[test]
fn scripts_survive_a_rewrite() {
    let pipfile = load("with-scripts");
    assert_eq!(pipfile.scripts["serve"], "flask run --debug");

    let rewritten: Pipfile = toml::from_str(&pipfile.to_toml_string().unwrap()).unwrap();
    assert_eq!(rewritten, pipfile);
}

#[test]
fn custom_categories_survive_a_rewrite() {
    let pipfile = load("custom-categories");
    assert_eq!(pipfile.extra.keys().collect::<Vec<_>>(), ["docs"]);

    let rewritten: toml::Table = toml::from_str(&pipfile.to_toml_string().unwrap()).unwrap();
    let original: toml::Table =
        toml::from_str(&fs_err::read_to_string(fixture("custom-categories")).unwrap()).unwrap();
    assert_eq!(rewritten["docs"], original["docs"]);
    assert_eq!(rewritten["source"], original["source"]);
    assert_eq!(
        rewritten["pipenv"]["install_search_all_sources"],
        original["pipenv"]["install_search_all_sources"]
    );
    assert_eq!(rewritten["pipenv"]["sort_pipfile"], original["pipenv"]["sort_pipfile"]);
}

#[test]
fn lock_hash_is_stable_across_rewrites() {
    for name in [
        "minimal",
        "with-dev-deps",
        "multiple-sources",
        "vcs-and-editable",
        "with-scripts",
        "complex-specs",
        "custom-categories",
    ] {
        let pipfile = load(name);
        let mut lock = PipfileLock::default();
        lock.stamp_meta(&pipfile);

        let rewritten: Pipfile = toml::from_str(&pipfile.to_toml_string().unwrap()).unwrap();
        assert!(lock.is_current_for(&rewritten), "{name}");
    }
}

#[test]
fn missing_pipfile_is_an_error() {
    let err = Pipfile::from_path(std::path::Path::new("/nonexistent/Pipfile")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/Pipfile"));
}
