//! End-to-end tests for checkpoint-and-resume parsing.
//!
//! These tests play the driver role: choose what to defer, redeem the
//! checkpoints in various orders, and check the result matches an eager
//! parse of the same tokens.

use pretty_assertions::assert_eq;
use vela_ir::{
    Decl, DeclKind, ExprKind, FunctionBody, LazyMemberParser, Members, Name, SourceUnit, StmtKind,
    StringInterner, TypeDecl,
};
use vela_lexer::lex;
use vela_parse::{DelayedDeclKind, ParseMode, Parser, PersistentParserState};

fn find_fn<'u>(unit: &'u SourceUnit, interner: &StringInterner, name: &str) -> &'u Decl {
    let target = interner.intern(name);
    unit.decls
        .iter()
        .find(|decl| matches!(&decl.kind, DeclKind::Function(f) if f.name == target))
        .unwrap_or_else(|| panic!("function `{name}` not found"))
}

fn find_type<'u>(unit: &'u SourceUnit, interner: &StringInterner, name: &str) -> &'u Decl {
    let target = interner.intern(name);
    unit.decls
        .iter()
        .find(|decl| matches!(&decl.kind, DeclKind::Type(t) if t.name == target))
        .unwrap_or_else(|| panic!("type `{name}` not found"))
}

/// Project a member list to comparable shape: declaration ids are
/// allocation-order dependent, names and kinds are not.
fn member_shape(decl: &Decl) -> (u32, &'static str) {
    match &decl.kind {
        DeclKind::Function(f) => (f.name.raw(), "fn"),
        DeclKind::Type(t) => (t.name.raw(), "type"),
        DeclKind::Field(f) => (f.name.raw(), "field"),
        DeclKind::TopLevelCode(_) => (0, "code"),
    }
}

fn members_of(decl: &Decl) -> &[Decl] {
    let DeclKind::Type(TypeDecl {
        members: Members::Parsed(members),
        ..
    }) = &decl.kind
    else {
        panic!("members not materialized for {:?}", decl.id);
    };
    members
}

const PROGRAM: &str = "\
fn add(a: Int, b: Int) -> Int {
    return a + b
}

type Point {
    x: Int
    y: Int
    fn length(self_x: Int) -> Int {
        return self_x * self_x
    }
    type Inner {
        depth: Int
    }
}

fn twice(n: Int) -> Int {
    let doubler = |x| x + x
    return doubler(n)
}
";

#[test]
fn test_eager_parse_has_no_outstanding_records() {
    let interner = StringInterner::new();
    let tokens = lex(PROGRAM, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let (unit, errors) = Parser::new(&mut state, ParseMode::empty()).parse_source_unit();
    assert_eq!(errors, vec![]);
    assert_eq!(unit.decls.len(), 3);

    let add = find_fn(&unit, &interner, "add");
    assert!(matches!(
        &add.kind,
        DeclKind::Function(f) if matches!(f.body, FunctionBody::Parsed(_))
    ));
    assert!(!state.has_function_body(add.id));
    let point = find_type(&unit, &interner, "Point");
    assert!(!state.has_unparsed_members(point.id));
}

#[test]
fn test_delayed_bodies_resume_to_the_eager_parse() {
    let interner = StringInterner::new();
    let tokens = lex(PROGRAM, &interner);

    let mut eager_state = PersistentParserState::new(&tokens, &interner);
    let (eager_unit, eager_errors) =
        Parser::new(&mut eager_state, ParseMode::empty()).parse_source_unit();
    assert_eq!(eager_errors, vec![]);

    let mut lazy_state = PersistentParserState::new(&tokens, &interner);
    let (lazy_unit, lazy_errors) =
        Parser::new(&mut lazy_state, ParseMode::DELAY_FUNCTION_BODIES).parse_source_unit();
    assert_eq!(lazy_errors, vec![]);

    let add = find_fn(&lazy_unit, &interner, "add");
    let twice = find_fn(&lazy_unit, &interner, "twice");
    let DeclKind::Function(add_fn) = &add.kind else {
        panic!("not a function");
    };
    assert!(matches!(add_fn.body, FunctionBody::Unparsed(_)));
    assert!(lazy_state.has_function_body(add.id));
    assert!(lazy_state.has_function_body(twice.id));

    // Redeem in reverse declaration order; each body must match its own
    // eager counterpart exactly.
    let twice_block = Parser::resume_function_body(&mut lazy_state, twice.id)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));
    let add_block = Parser::resume_function_body(&mut lazy_state, add.id)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));

    let DeclKind::Function(eager_add) = &find_fn(&eager_unit, &interner, "add").kind else {
        panic!("not a function");
    };
    let DeclKind::Function(eager_twice) = &find_fn(&eager_unit, &interner, "twice").kind else {
        panic!("not a function");
    };
    let FunctionBody::Parsed(eager_add_block) = &eager_add.body else {
        panic!("eager body unparsed");
    };
    let FunctionBody::Parsed(eager_twice_block) = &eager_twice.body else {
        panic!("eager body unparsed");
    };
    assert_eq!(&add_block, eager_add_block);
    assert_eq!(&twice_block, eager_twice_block);

    // Redeemed records are gone.
    assert!(!lazy_state.has_function_body(add.id));
    assert!(!lazy_state.has_function_body(twice.id));
}

#[test]
fn test_member_lists_drain_to_fixed_point() {
    let interner = StringInterner::new();
    let tokens = lex(PROGRAM, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let (mut unit, errors) = Parser::new(
        &mut state,
        ParseMode::DELAY_MEMBER_LISTS | ParseMode::DELAY_FUNCTION_BODIES,
    )
    .parse_source_unit();
    assert_eq!(errors, vec![]);

    let point_id = find_type(&unit, &interner, "Point").id;
    assert!(state.has_unparsed_members(point_id));

    // Drain everything; the nested `Inner` context only gets registered
    // while `Point`'s members materialize, and must drain too.
    let lists = state.parse_all_delayed_member_lists();
    unit.install_all_members(lists);

    let point = find_type(&unit, &interner, "Point");
    assert!(!state.has_unparsed_members(point.id));
    let shapes: Vec<_> = members_of(point).iter().map(member_shape).collect();
    assert_eq!(
        shapes,
        vec![
            (interner.intern("x").raw(), "field"),
            (interner.intern("y").raw(), "field"),
            (interner.intern("length").raw(), "fn"),
            (interner.intern("Inner").raw(), "type"),
        ]
    );

    let inner = members_of(point)
        .iter()
        .find(|d| matches!(&d.kind, DeclKind::Type(t) if t.name == interner.intern("Inner")))
        .unwrap_or_else(|| panic!("Inner not found"));
    assert!(!state.has_unparsed_members(inner.id), "nested context not drained");
    assert_eq!(
        members_of(inner).iter().map(member_shape).collect::<Vec<_>>(),
        vec![(interner.intern("depth").raw(), "field")]
    );

    // Idempotent: nothing left to drain.
    assert!(state.parse_all_delayed_member_lists().is_empty());
}

#[test]
fn test_single_context_materialization_matches_eager() {
    let interner = StringInterner::new();
    let tokens = lex(PROGRAM, &interner);

    let mut eager_state = PersistentParserState::new(&tokens, &interner);
    let (eager_unit, _) = Parser::new(&mut eager_state, ParseMode::empty()).parse_source_unit();

    let mut state = PersistentParserState::new(&tokens, &interner);
    let (mut unit, _) =
        Parser::new(&mut state, ParseMode::DELAY_MEMBER_LISTS).parse_source_unit();
    let point_id = find_type(&unit, &interner, "Point").id;

    // The AST-layer contract: poll, materialize, insert in parse order.
    assert!(state.has_unparsed_members(point_id));
    let members = state.parse_members(point_id);
    assert!(!state.has_unparsed_members(point_id));
    if let Err(_unplaced) = unit.install_members(point_id, members) {
        panic!("context not found in unit");
    }

    let eager_point = find_type(&eager_unit, &interner, "Point");
    let lazy_point = find_type(&unit, &interner, "Point");
    assert_eq!(
        members_of(lazy_point).iter().map(member_shape).collect::<Vec<_>>(),
        members_of(eager_point).iter().map(member_shape).collect::<Vec<_>>(),
    );
}

#[test]
fn test_body_closure_discriminators_match_eager_parse() {
    let source = "\
fn pair(n: Int) -> Int {
    let first = |x| x + n
    let second = |y| |z| y + z
    return first(second(1)(2))
}
";
    let interner = StringInterner::new();
    let tokens = lex(source, &interner);

    let mut eager_state = PersistentParserState::new(&tokens, &interner);
    let (eager_unit, _) = Parser::new(&mut eager_state, ParseMode::empty()).parse_source_unit();

    let mut lazy_state = PersistentParserState::new(&tokens, &interner);
    let (lazy_unit, _) =
        Parser::new(&mut lazy_state, ParseMode::DELAY_FUNCTION_BODIES).parse_source_unit();
    let pair = find_fn(&lazy_unit, &interner, "pair");
    let block = Parser::resume_function_body(&mut lazy_state, pair.id)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));

    let DeclKind::Function(eager_pair) = &find_fn(&eager_unit, &interner, "pair").kind else {
        panic!("not a function");
    };
    let FunctionBody::Parsed(eager_block) = &eager_pair.body else {
        panic!("eager body unparsed");
    };
    // Full equality includes every closure discriminator.
    assert_eq!(&block, eager_block);
}

const INTERACTIVE_PROGRAM: &str = "\
let shared = |a| a

fn before() -> Int {
    return 1
}

fn target(k: Int) -> Int {
    let inner = |q| q + k
    return inner(k)
}

let tail = |b| b
";

fn offset_of(source: &str, needle: &str) -> u32 {
    u32::try_from(source.find(needle).unwrap_or_else(|| panic!("`{needle}` not in source")))
        .unwrap_or_else(|_| panic!("offset overflow"))
}

#[test]
fn test_interest_offset_delays_one_declaration_and_stops() {
    let interner = StringInterner::new();
    let tokens = lex(INTERACTIVE_PROGRAM, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let offset = offset_of(INTERACTIVE_PROGRAM, "inner(k)");
    let (unit, errors) = Parser::new(&mut state, ParseMode::empty())
        .with_interest_offset(offset)
        .parse_source_unit();
    assert_eq!(errors, vec![]);

    // Parse stopped at `target`: everything before it is present,
    // everything after is not.
    assert_eq!(unit.decls.len(), 2);
    assert!(state.has_delayed_decl());
    assert_eq!(state.delayed_decl_kind(), DelayedDeclKind::Decl);

    // The remainder picks up from the marked stop position.
    let (rest, rest_errors) = Parser::resume_remainder(&mut state, ParseMode::empty());
    assert_eq!(rest_errors, vec![]);
    assert_eq!(rest.len(), 1);
    assert!(matches!(rest[0].kind, DeclKind::TopLevelCode(_)));

    // A second remainder resume is a no-op: the mark was cleared.
    let (again, _) = Parser::resume_remainder(&mut state, ParseMode::empty());
    assert!(again.is_empty());

    // Redeeming the record parses the declaration in full.
    let target = Parser::resume_delayed_decl(&mut state)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));
    assert!(!state.has_delayed_decl());
    let DeclKind::Function(target_fn) = &target.kind else {
        panic!("expected the function declaration");
    };
    assert_eq!(target_fn.name, interner.intern("target"));
    assert!(matches!(target_fn.body, FunctionBody::Parsed(_)));
}

#[test]
fn test_interest_in_top_level_code_delays_the_statement_run() {
    let interner = StringInterner::new();
    let tokens = lex(INTERACTIVE_PROGRAM, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let offset = offset_of(INTERACTIVE_PROGRAM, "|a| a");
    let (unit, _) = Parser::new(&mut state, ParseMode::empty())
        .with_interest_offset(offset)
        .parse_source_unit();

    assert!(unit.decls.is_empty());
    assert_eq!(state.delayed_decl_kind(), DelayedDeclKind::TopLevelCode);

    let chunk = Parser::resume_delayed_decl(&mut state)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));
    let DeclKind::TopLevelCode(code) = &chunk.kind else {
        panic!("expected top-level code");
    };
    assert_eq!(code.body.stmts.len(), 1);
    assert!(matches!(
        code.body.stmts[0].kind,
        StmtKind::Let { name, .. } if name == interner.intern("shared")
    ));
}

#[test]
fn test_top_level_discriminators_survive_out_of_order_resumption() {
    let interner = StringInterner::new();
    let tokens = lex(INTERACTIVE_PROGRAM, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    // Delay the first top-level chunk, then parse the rest of the file
    // before coming back to it.
    let offset = offset_of(INTERACTIVE_PROGRAM, "|a| a");
    let (_, errors) = Parser::new(&mut state, ParseMode::empty())
        .with_interest_offset(offset)
        .parse_source_unit();
    assert_eq!(errors, vec![]);

    let (rest, _) = Parser::resume_remainder(&mut state, ParseMode::empty());
    let chunk = Parser::resume_delayed_decl(&mut state)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));

    let closure_discriminator = |decl: &Decl| -> u32 {
        let DeclKind::TopLevelCode(code) = &decl.kind else {
            panic!("expected top-level code");
        };
        let StmtKind::Let { init, .. } = &code.body.stmts[0].kind else {
            panic!("expected let statement");
        };
        let ExprKind::Closure { discriminator, .. } = &init.kind else {
            panic!("expected closure initializer");
        };
        *discriminator
    };

    let tail_chunk = rest
        .iter()
        .find(|d| matches!(d.kind, DeclKind::TopLevelCode(_)))
        .unwrap_or_else(|| panic!("tail chunk not parsed"));

    // The chunk parsed first claimed 0; the chunk resumed later claimed
    // the next discriminator from the same file-wide context. No reuse,
    // no collision, monotonic across resumption order.
    assert_eq!(closure_discriminator(tail_chunk), 0);
    assert_eq!(closure_discriminator(&chunk), 1);
    assert_eq!(
        state.top_level_context().closure_discriminators_claimed(),
        2
    );
}

#[test]
fn test_delayed_decl_mode_travels_with_the_record() {
    let interner = StringInterner::new();
    let tokens = lex(INTERACTIVE_PROGRAM, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let offset = offset_of(INTERACTIVE_PROGRAM, "inner(k)");
    let (_, errors) = Parser::new(&mut state, ParseMode::DELAY_FUNCTION_BODIES)
        .with_interest_offset(offset)
        .parse_source_unit();
    assert_eq!(errors, vec![]);

    // The resumed declaration parses under the recorded mode, so its
    // body is delayed again and can be redeemed separately.
    let target = Parser::resume_delayed_decl(&mut state)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));
    let DeclKind::Function(target_fn) = &target.kind else {
        panic!("expected a function");
    };
    assert!(matches!(target_fn.body, FunctionBody::Unparsed(_)));
    assert!(state.has_function_body(target.id));

    let block = Parser::resume_function_body(&mut state, target.id)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));
    assert_eq!(block.stmts.len(), 2);
}

#[test]
fn test_line_directive_flag_rides_with_the_mark() {
    let source = "\
#line 40
fn renumbered() -> Int {
    return 1
}

let after = 2
";
    let interner = StringInterner::new();
    let tokens = lex(source, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let offset = offset_of(source, "return 1");
    let (_, errors) = Parser::new(&mut state, ParseMode::empty())
        .with_interest_offset(offset)
        .parse_source_unit();
    assert_eq!(errors, vec![]);

    // The parse stopped inside the `#line`-renumbered region and said so.
    assert!(state.has_delayed_decl());
    assert!(state.in_line_directive_region());

    let (rest, rest_errors) = Parser::resume_remainder(&mut state, ParseMode::empty());
    assert_eq!(rest_errors, vec![]);
    assert_eq!(rest.len(), 1);
}

#[test]
fn test_resumed_member_list_errors_reach_the_diagnostic_queue() {
    let source = "\
type Broken {
    x: Int
    y Int
}
";
    let interner = StringInterner::new();
    let tokens = lex(source, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let (unit, errors) =
        Parser::new(&mut state, ParseMode::DELAY_MEMBER_LISTS).parse_source_unit();
    // Skipping is purely brace-driven; the bad member is not seen yet.
    assert_eq!(errors, vec![]);

    let broken_id = find_type(&unit, &interner, "Broken").id;
    let members = state.parse_members(broken_id);
    // The well-formed member still materializes.
    assert_eq!(members.len(), 1);
    assert!(state.diagnostics().has_errors());
    let drained = state.take_diagnostics();
    assert_eq!(drained.len(), 1);
    assert!(state.diagnostics().is_empty());
}

#[test]
fn test_unclosed_body_is_a_parse_error_not_a_checkpoint() {
    let source = "fn broken() {\n    return 1\n";
    let interner = StringInterner::new();
    let tokens = lex(source, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let (unit, errors) =
        Parser::new(&mut state, ParseMode::DELAY_FUNCTION_BODIES).parse_source_unit();
    assert!(unit.decls.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code(), vela_diagnostic::ErrorCode::E1003);
}

#[test]
fn test_name_lookup_inside_deferred_body_sees_the_snapshot() {
    // `shadow` is rebound between the delay and the resume; the resumed
    // body must still see the chain captured at delay time.
    let source = "\
fn uses_outer(v: Int) -> Int {
    return v
}
";
    let interner = StringInterner::new();
    let tokens = lex(source, &interner);
    let mut state = PersistentParserState::new(&tokens, &interner);

    let (unit, _) =
        Parser::new(&mut state, ParseMode::DELAY_FUNCTION_BODIES).parse_source_unit();
    let decl = find_fn(&unit, &interner, "uses_outer");

    // After the main parse, the parameter is no longer in the live chain.
    let v: Name = interner.intern("v");
    assert_eq!(state.scope_info().lookup(v), None);

    // Resuming restores it for the duration of the body parse, and puts
    // the live chain back afterwards.
    let block = Parser::resume_function_body(&mut state, decl.id)
        .unwrap_or_else(|e| panic!("resume failed: {e}"));
    assert_eq!(block.stmts.len(), 1);
    assert_eq!(state.scope_info().lookup(v), None);
    assert!(state.scope_info().lookup(interner.intern("uses_outer")).is_some());
}
