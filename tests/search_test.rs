//! Search behaviour across both scan strategies


use codex::search::{BuiltinStrategy, MAX_RESPONSE_BYTES, ScanStrategy};
use codex::{SearchEngine, SearchRequest};
use std::sync::Arc;
use test_helpers::*;

fn request(query: &str, limit: i64) -> SearchRequest {
    let mut req = SearchRequest::new(query);
    req.limit = limit;
    req
}

#[test]
fn test_single_match_scenario() {
    let ws = Workspace::new();
    let root = ws.repo("svc");
    ws.write("svc/a.go", &numbered_lines(20, 5, "func foo() {}"));

    let engine = builtin_engine(vec![directory(1, &root, "backend-business")], &ws.ignore_file());
    let matches = engine.search(&request("foo", 10)).unwrap();

    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert!(m.path.ends_with("a.go"));
    assert!(m.line_start <= 5 && 5 <= m.line_end);
    assert!(m.snippet.contains("func foo() {}"));
    assert_eq!(m.snippet.lines().count(), 12); // lines 1..=12
}

#[test]
fn test_dependency_cache_only_yields_nothing() {
    let ws = Workspace::new();
    let root = ws.repo("web");
    ws.write("web/node_modules/left-pad/index.js", "module.exports = foo;\n");
    ws.write("web/node_modules/.bin/foo", "#!/bin/sh\nfoo\n");

    let engine = builtin_engine(vec![directory(1, &root, "frontend-business")], &ws.ignore_file());
    assert!(engine.search(&request("foo", 10)).unwrap().is_empty());

    if let Some(rg) = ripgrep() {
        let matches = engine.search_with_strategy(&request("foo", 10), &rg).unwrap();
        assert!(matches.is_empty());
    }
}

#[test]
fn test_backend_role_without_backend_directories() {
    let ws = Workspace::new();
    let root = ws.repo("web");
    ws.write("web/app.ts", "const foo = 1;\n");

    let engine = builtin_engine(vec![directory(1, &root, "frontend-framework")], &ws.ignore_file());
    let mut req = request("foo", 10);
    req.role = Some("backend".to_string());

    assert!(engine.search(&req).unwrap().is_empty());
}

#[test]
fn test_role_and_path_hint_narrow_scope() {
    let ws = Workspace::new();
    let web = ws.repo("web-app");
    let api = ws.repo("orders-api");
    let core = ws.repo("rpc-core");
    ws.write("web-app/a.ts", "foo\n");
    ws.write("orders-api/a.go", "foo\n");
    ws.write("rpc-core/a.go", "foo\n");

    let engine = builtin_engine(
        vec![
            directory(1, &web, "frontend-business"),
            directory(2, &api, "backend-business"),
            directory(3, &core, "backend-framework"),
        ],
        &ws.ignore_file(),
    );

    let mut req = request("foo", 10);
    req.role = Some("backend".to_string());
    assert_eq!(engine.search(&req).unwrap().len(), 2);

    req.path_hint = Some("orders".to_string());
    let matches = engine.search(&req).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].path.contains("orders-api"));
}

#[test]
fn test_limit_and_budget_hold() {
    let ws = Workspace::new();
    let root = ws.repo("big");
    let long_line = format!("foo {}", "x".repeat(3000));
    for i in 0..10 {
        let content: String = (0..30).map(|_| format!("{}\n", long_line)).collect();
        ws.write(&format!("big/file{}.txt", i), &content);
    }

    let engine = builtin_engine(vec![directory(1, &root, "backend-business")], &ws.ignore_file());

    for limit in [-1, 0, 1, 3, 10, 20, 50] {
        let matches = engine.search(&request("foo", limit)).unwrap();
        let expected_cap = request("foo", limit).effective_limit();
        assert_within_budget(&matches, expected_cap);
        assert!(!matches.is_empty());
    }

    // 15-line snippets of ~3 KiB lines blow the byte budget before the count limit
    let matches = engine.search(&request("foo", 20)).unwrap();
    assert!(matches.len() < 20);
    let bytes: usize = matches.iter().map(|m| m.budget_size()).sum();
    assert!(bytes <= MAX_RESPONSE_BYTES);
}

#[test]
fn test_empty_query_returns_empty() {
    let ws = Workspace::new();
    let root = ws.repo("svc");
    ws.write("svc/a.go", "foo\n");

    let engine = builtin_engine(vec![directory(1, &root, "backend-business")], &ws.ignore_file());
    assert!(engine.search(&request("", 10)).unwrap().is_empty());
}

#[test]
fn test_no_directories_returns_empty() {
    let ws = Workspace::new();
    let engine = builtin_engine(vec![], &ws.ignore_file());
    assert!(engine.search(&request("foo", 10)).unwrap().is_empty());
}

#[test]
fn test_ignore_file_edits_apply_to_next_search() {
    let ws = Workspace::new();
    let root = ws.repo("svc");
    ws.write("svc/src/main.go", "foo\n");
    ws.write("svc/generated/api.go", "foo\n");

    let engine = builtin_engine(vec![directory(1, &root, "backend-business")], &ws.ignore_file());
    assert_eq!(engine.search(&request("foo", 10)).unwrap().len(), 2);
    // First search seeded the default ignore file
    assert!(ws.ignore_file().exists());

    codex::ignore_file::write_ignore_file(ws.ignore_file(), b"generated/\n").unwrap();
    let matches = engine.search(&request("foo", 10)).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].path.ends_with("main.go"));
}

#[test]
fn test_symlinked_escape_is_not_followed() {
    #[cfg(unix)]
    {
        let ws = Workspace::new();
        let root = ws.repo("svc");
        let outside = ws.repo("secrets");
        ws.write("secrets/key.txt", "foo secret\n");
        ws.write("svc/a.txt", "foo\n");
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        let engine = builtin_engine(vec![directory(1, &root, "backend-business")], &ws.ignore_file());
        let matches = engine.search(&request("foo", 10)).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].path.ends_with("a.txt"));
    }
}

#[test]
fn test_strategies_agree() {
    let Some(rg) = ripgrep() else {
        eprintln!("rg not installed, skipping strategy comparison");
        return;
    };

    let ws = Workspace::new();
    let api = ws.repo("api");
    let web = ws.repo("web");
    ws.write("api/handlers/login.go", &numbered_lines(40, 12, "func HandleLogin() {}"));
    ws.write("api/handlers/logout.go", &numbered_lines(8, 3, "// see handleLogin"));
    ws.write("api/app.log", "handlelogin called\n");
    ws.write("api/build/out.go", "HandleLogin\n");
    ws.write("api/vendor/dep/x.go", "HandleLogin\n");
    ws.write("web/src/login.ts", &numbered_lines(5, 5, "export const handleLogin = () => {};"));
    // A repo's own .gitignore and hidden directories do not hide anything
    ws.write("web/.gitignore", "dist/\n");
    ws.write("web/dist/app.js", "handleLogin();\n");
    ws.write("web/.github/ci.yml", "run: handlelogin-check\n");
    codex::ignore_file::write_ignore_file(ws.ignore_file(), b"*.log\nbuild\n").unwrap();

    let engine = SearchEngine::new(Arc::new(vec![
        directory(1, &api, "backend-business"),
        directory(2, &web, "frontend-business"),
    ]))
    .with_ignore_file(ws.ignore_file());

    let req = request("handlelogin", 20);
    let builtin = engine.search_with_strategy(&req, &BuiltinStrategy).unwrap();
    let accelerated = engine.search_with_strategy(&req, &rg).unwrap();

    assert_eq!(builtin.len(), 5);
    assert_eq!(spans(&builtin), spans(&accelerated));
    assert_eq!(rg.name(), "ripgrep");
}

#[test]
fn test_root_under_excluded_directory_name() {
    let ws = Workspace::new();
    let root = ws.repo("target/svc");
    ws.write("target/svc/a.go", "func foo() {}\n");
    ws.write("target/svc/vendor/dep.go", "func foo() {}\n");

    let engine = builtin_engine(vec![directory(1, &root, "backend-business")], &ws.ignore_file());
    let matches = engine.search(&request("foo", 10)).unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].path.ends_with("a.go"));

    if let Some(rg) = ripgrep() {
        let accelerated = engine.search_with_strategy(&request("foo", 10), &rg).unwrap();
        assert_eq!(spans(&matches), spans(&accelerated));
    }
}
