#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use problemkit::{
    Context, Definition, Extensions, Flags, Generator, LogLevel, Matcher, Operator, Problem,
    ProblemOption, ProblemType, StaticTranslator, Unwrapper, as_match, as_problem, is_match,
};
use serde_json::{Value, json};

fn counting_ids() -> (Generator, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let generator = Generator::new().with_id_generator(move |_: &Context| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        format!("id-{n}")
    });
    (generator, calls)
}

fn not_found() -> Definition {
    Definition::new()
        .with_code("USER-404")
        .with_detail("definition detail")
        .with_type(
            ProblemType::new()
                .with_status(404)
                .with_title("Not Found")
                .with_log_level(LogLevel::Info),
        )
}

#[test]
fn explicit_values_beat_every_other_tier() {
    let generator = Generator::new()
        .with_typer(|_| Some("urn:typer".to_owned()))
        .with_leveler(|_| Some(LogLevel::Debug));
    let inner = generator
        .builder()
        .code("INNER-1")
        .detail("inner detail")
        .instance("/inner")
        .status(409)
        .title("Conflict")
        .type_uri("urn:inner")
        .log_level(LogLevel::Warn)
        .into_problem();

    let p = not_found()
        .builder(&generator)
        .wrap_with(inner, &Unwrapper::All)
        .code("EXPLICIT-1")
        .detail("explicit detail")
        .instance("/explicit")
        .status(422)
        .title("Explicit")
        .type_uri("urn:explicit")
        .log_level(LogLevel::Error)
        .into_problem();

    assert_eq!(p.code().as_str(), "EXPLICIT-1");
    assert_eq!(p.detail(), "explicit detail");
    assert_eq!(p.instance(), "/explicit");
    assert_eq!(p.status(), 422);
    assert_eq!(p.title(), "Explicit");
    assert_eq!(p.type_uri(), "urn:explicit");
    assert_eq!(p.log_level(), LogLevel::Error);
}

#[test]
fn inherited_values_beat_definitions_and_collaborators() {
    let generator = Generator::new()
        .with_typer(|_| Some("urn:typer".to_owned()))
        .with_leveler(|_| Some(LogLevel::Debug));
    let inner = generator
        .builder()
        .code("INNER-1")
        .status(409)
        .title("Conflict")
        .type_uri("urn:inner")
        .log_level(LogLevel::Warn)
        .into_problem();

    let p = not_found()
        .builder(&generator)
        .wrap_with(inner, &Unwrapper::All)
        .into_problem();

    assert_eq!(p.code().as_str(), "INNER-1");
    assert_eq!(p.status(), 409);
    assert_eq!(p.title(), "Conflict");
    assert_eq!(p.type_uri(), "urn:inner");
    assert_eq!(p.log_level(), LogLevel::Warn);
    assert_eq!(p.detail(), "definition detail");
}

#[test]
fn propagated_unwrapping_only_keeps_generated_data() {
    let (generator, calls) = counting_ids();
    let generator = generator.with_uuid_flags(Flags::ALL);
    let inner = generator
        .builder()
        .status(409)
        .title("Conflict")
        .into_problem();
    assert_eq!(inner.uuid(), "id-0");

    let outer = not_found().builder(&generator).wrap(inner).into_problem();
    assert_eq!(outer.status(), 404);
    assert_eq!(outer.title(), "Not Found");
    assert_eq!(outer.uuid(), "id-0");
    assert_eq!(outer.log_info().uuid, "id-0");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn resolving_twice_reuses_generated_data() {
    let (generator, calls) = counting_ids();
    let captures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&captures);
    let generator = generator.with_stack_capturer(move |_: usize| {
        counter.fetch_add(1, Ordering::SeqCst);
        "main\n\tsrc/main.rs:1".to_owned()
    });

    let mut builder = generator.builder().stack().uuid();
    let first = builder.resolve();
    let second = builder.resolve();

    assert_eq!(first, second);
    assert_eq!(first.uuid(), "id-0");
    assert_eq!(first.stack(), "main\n\tsrc/main.rs:1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(captures.load(Ordering::SeqCst), 1);
}

#[test]
fn resolved_extensions_are_independent_of_the_caller_map() {
    let mut extensions = Extensions::new();
    extensions.insert("tenant".to_owned(), json!("acme"));
    let definition = Definition::new().with_extensions(extensions.clone());

    let from_definition = definition.builder(Generator::global()).into_problem();
    let explicit = Generator::global()
        .builder()
        .extensions(extensions.clone())
        .into_problem();

    extensions.insert("tenant".to_owned(), json!("changed"));
    extensions.insert("extra".to_owned(), json!(true));

    assert_eq!(from_definition.extension("tenant"), Some(&json!("acme")));
    assert_eq!(explicit.extension("tenant"), Some(&json!("acme")));
    assert!(explicit.extension("extra").is_none());
}

#[test]
fn empty_translation_falls_back_to_type_title() {
    let generator = Generator::new().with_translator(|_: &Context, _: &str| String::new());
    let p = ProblemType::new()
        .with_title("Not Found")
        .with_title_key("http.not_found")
        .builder(&generator)
        .into_problem();
    assert_eq!(p.title(), "Not Found");
}

#[test]
fn inherited_log_only_uuid_surfaces_on_field_only_request() {
    let (generator, calls) = counting_ids();
    let inner = generator
        .builder()
        .uuid_flags(&[Flags::LOG])
        .into_problem();
    assert!(inner.uuid().is_empty());
    assert_eq!(inner.log_info().uuid, "id-0");

    let outer = generator
        .builder()
        .wrap(inner)
        .uuid_flags(&[Flags::FIELD])
        .into_problem();
    assert_eq!(outer.uuid(), "id-0");
    assert!(outer.log_info().uuid.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn localized_titles_follow_context_locale() {
    let generator = Generator::new().with_translator(
        StaticTranslator::new()
            .with_entry("user.not_found", "User not found")
            .with_locale_entry("fr", "user.not_found", "Utilisateur introuvable"),
    );
    let definition = not_found().with_type(
        ProblemType::new()
            .with_status(404)
            .with_title_key("user.not_found"),
    );

    let french = generator.new_problem_with_context(
        Context::new().with_locale("fr-CA"),
        [ProblemOption::from_definition(definition.clone())],
    );
    assert_eq!(french.title(), "Utilisateur introuvable");

    let default = definition.new_problem(&generator, []);
    assert_eq!(default.title(), "User not found");
}

#[test]
fn as_match_finds_innermost_match_through_foreign_errors() {
    #[derive(Debug, thiserror::Error)]
    #[error("repository failed")]
    struct RepositoryError(#[source] Problem);

    let generator = Generator::new();
    let innermost = generator
        .builder()
        .status(404)
        .code("USER-404")
        .into_problem();
    let middle = generator
        .builder()
        .status(500)
        .wrap(RepositoryError(innermost))
        .into_problem();
    let outer = generator.builder().status(502).wrap(middle).into_problem();

    let found = as_match(&outer, &[Matcher::code_namespace("USER")]).unwrap();
    assert_eq!(found.status(), 404);
    assert!(is_match(&outer, &[Matcher::status_with(500, Operator::Ge)]));
    assert_eq!(as_problem(&outer).unwrap().status(), 502);
    assert!(!is_match(&outer, &[Matcher::status(418)]));
}

#[test]
fn boxed_errors_can_be_wrapped() {
    let err: Box<dyn Error + Send + Sync> = "connection reset".into();
    let p = Generator::global()
        .builder()
        .status(503)
        .wrap_shared(err)
        .into_problem();
    assert_eq!(p.source().unwrap().to_string(), "connection reset");
    assert_eq!(p.message_with_source(), "503 Unknown Error: connection reset");
}

#[test]
fn serialized_problem_hides_log_only_data() {
    let (generator, _) = counting_ids();
    let p = generator
        .builder()
        .status(404)
        .title("Not Found")
        .extension("tenant", "acme")
        .uuid_flags(&[Flags::LOG])
        .into_problem();

    let value = serde_json::to_value(&p).unwrap();
    assert_eq!(
        value,
        json!({
            "status": 404,
            "title": "Not Found",
            "type": "about:blank",
            "tenant": "acme"
        })
    );
    assert_eq!(p.log_value()["uuid"], Value::from("id-0"));

    let back: Problem = serde_json::from_value(value).unwrap();
    assert_eq!(back.extension("tenant"), Some(&json!("acme")));
    assert!(back.uuid().is_empty());
}

#[test]
fn inherited_log_only_stack_beats_the_capturer() {
    let inner = Generator::new()
        .with_stack_capturer(|_: usize| "inner\n\tsrc/inner.rs:7".to_owned())
        .builder()
        .stack_flags(&[Flags::LOG])
        .into_problem();
    assert!(inner.stack().is_empty());

    let captures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&captures);
    let outer = Generator::new()
        .with_stack_capturer(move |_: usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            "outer".to_owned()
        })
        .builder()
        .wrap(inner)
        .stack_flags(&[Flags::FIELD])
        .into_problem();

    assert_eq!(outer.stack(), "inner\n\tsrc/inner.rs:7");
    assert!(outer.log_info().stack.is_empty());
    assert_eq!(captures.load(Ordering::SeqCst), 0);
}

#[test]
fn default_stack_starts_at_the_caller() {
    let generator = Generator::new();
    let full = generator
        .builder()
        .stack_flags(&[Flags::FIELD])
        .into_problem();
    let first = full.stack().lines().next().unwrap();
    assert_eq!(first, "resolution::default_stack_starts_at_the_caller");
    assert!(!full.stack().contains("problemkit::"));

    let skipped = generator
        .builder()
        .stack_flags(&[Flags::FIELD])
        .stack_frames_skipped(1)
        .into_problem();
    assert_ne!(skipped.stack().lines().next(), Some(first));
}

#[test]
fn reserved_definition_extensions_never_reach_a_problem() {
    let definition: Definition =
        serde_json::from_value(json!({ "extensions": { "status": "shadow" } })).unwrap();
    let res = Generator::global().builder().try_definition(definition);
    assert!(res.is_err());
}
