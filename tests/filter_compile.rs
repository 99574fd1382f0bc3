use quaydsl::{Error, N1qlSerializer, OrderSpecifier, Predicate, Projection, SortDirection};
use serde_json::json;

fn compile(predicate: &Predicate) -> (String, Vec<serde_json::Value>) {
    let compiled = N1qlSerializer::new()
        .compile(predicate)
        .expect("predicate should compile");
    (compiled.clause().to_string(), compiled.params().to_vec())
}

#[test]
fn eq() {
    let (clause, params) = compile(&Predicate::eq("name", "United Airlines"));
    assert_eq!(clause, " WHERE name = $1");
    assert_eq!(params, vec![json!("United Airlines")]);
}

#[test]
fn ne() {
    let (clause, params) = compile(&Predicate::ne("name", "United Airlines"));
    assert_eq!(clause, " WHERE name != $1");
    assert_eq!(params, vec![json!("United Airlines")]);
}

#[test]
fn comparisons() {
    let (clause, _) = compile(&Predicate::lt("name", "Lufthansa"));
    assert_eq!(clause, " WHERE name < $1");
    let (clause, _) = compile(&Predicate::gt("name", "Lufthansa"));
    assert_eq!(clause, " WHERE name > $1");
    let (clause, _) = compile(&Predicate::loe("name", "Lufthansa"));
    assert_eq!(clause, " WHERE name <= $1");
    let (clause, _) = compile(&Predicate::goe("name", "Lufthansa"));
    assert_eq!(clause, " WHERE name >= $1");
}

#[test]
fn and() {
    let predicate = Predicate::eq("name", "United Airlines").and_then(Predicate::eq("hqCountry", "US"));
    let (clause, params) = compile(&predicate);
    assert_eq!(clause, " WHERE   (name = $1) and   (hqCountry = $2)");
    assert_eq!(params, vec![json!("United Airlines"), json!("US")]);
}

#[test]
fn or() {
    let predicate = Predicate::eq("name", "United Airlines").or_else(Predicate::eq("hqCountry", "DE"));
    let (clause, _) = compile(&predicate);
    assert_eq!(clause, " WHERE   (name = $1) or   (hqCountry = $2)");
}

#[test]
fn not_wraps_inner_filter() {
    let (clause, _) = compile(&Predicate::eq("name", "United Airlines").not());
    assert_eq!(clause, " WHERE not( (name = $1) )");
}

#[test]
fn not_over_conjunction() {
    let predicate = Predicate::eq("name", "X")
        .and_then(Predicate::eq("country", "Y"))
        .not();
    let (clause, params) = compile(&predicate);
    assert_eq!(clause, " WHERE not( (  (name = $1) and   (country = $2)) )");
    assert_eq!(params, vec![json!("X"), json!("Y")]);
}

#[test]
fn double_negation_is_not_simplified() {
    let (clause, _) = compile(&Predicate::eq("name", "X").not().not());
    assert_eq!(clause, " WHERE not( (not( (name = $1) )) )");
}

#[test]
fn starts_with() {
    let (clause, params) = compile(&Predicate::starts_with("name", "Uni"));
    assert_eq!(clause, " WHERE name like ($1||\"%\")");
    assert_eq!(params, vec![json!("Uni")]);
}

#[test]
fn starts_with_ignore_case_uppercases_field_and_literal() {
    let (clause, params) = compile(&Predicate::starts_with_ignore_case("name", "Uni"));
    assert_eq!(clause, " WHERE UPPER(name) like ($1||\"%\")");
    assert_eq!(params, vec![json!("UNI")]);
}

#[test]
fn ends_with() {
    let (clause, params) = compile(&Predicate::ends_with("name", "nited Airlines"));
    assert_eq!(clause, " WHERE name like (\"%\"||$1)");
    assert_eq!(params, vec![json!("nited Airlines")]);
}

#[test]
fn ends_with_ignore_case() {
    let (clause, params) = compile(&Predicate::ends_with_ignore_case("name", "Airlines"));
    assert_eq!(clause, " WHERE UPPER(name) like (\"%\"||$1)");
    assert_eq!(params, vec![json!("AIRLINES")]);
}

#[test]
fn contains() {
    let (clause, params) = compile(&Predicate::contains("name", "United"));
    assert_eq!(clause, " WHERE contains(name, $1)");
    assert_eq!(params, vec![json!("United")]);
}

#[test]
fn contains_ignore_case() {
    let (clause, params) = compile(&Predicate::contains_ignore_case("name", "united"));
    assert_eq!(clause, " WHERE contains(UPPER(name), $1)");
    assert_eq!(params, vec![json!("UNITED")]);
}

#[test]
fn like() {
    let (clause, _) = compile(&Predicate::like("name", "%nited%"));
    assert_eq!(clause, " WHERE name like $1");
}

#[test]
fn like_ignore_case() {
    let (clause, params) = compile(&Predicate::like_ignore_case("name", "%Airlines"));
    assert_eq!(clause, " WHERE UPPER(name) like $1");
    assert_eq!(params, vec![json!("%AIRLINES")]);
}

#[test]
fn eq_ignore_case() {
    let (clause, params) = compile(&Predicate::eq_ignore_case("name", "united airlines"));
    assert_eq!(clause, " WHERE UPPER(name) = $1");
    assert_eq!(params, vec![json!("UNITED AIRLINES")]);
}

#[test]
fn matches_regexp() {
    let (clause, _) = compile(&Predicate::matches("name", "[Uu]nited.*"));
    assert_eq!(clause, " WHERE regexp_like(name, $1)");
}

#[test]
fn matches_rejects_invalid_pattern_at_compile_time() {
    let err = N1qlSerializer::new()
        .compile(&Predicate::matches("name", "[unclosed"))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedExpression(_)), "got {err:?}");
}

#[test]
fn between_is_inclusive_two_params() {
    let (clause, params) = compile(&Predicate::between("name", "Fly By Night", "United Airlines"));
    assert_eq!(clause, " WHERE name between $1 and $2");
    assert_eq!(params.len(), 2);
}

#[test]
fn in_single_element_degrades_to_eq() {
    let (in_clause, in_params) = compile(&Predicate::r#in("name", ["United Airlines"]));
    let (eq_clause, eq_params) = compile(&Predicate::eq("name", "United Airlines"));
    assert_eq!(in_clause, eq_clause);
    assert_eq!(in_params, eq_params);
}

#[test]
fn in_many_elements_binds_one_array_param() {
    let (clause, params) = compile(&Predicate::r#in("name", ["United Airlines", "Lufthansa"]));
    assert_eq!(clause, " WHERE name in $1");
    assert_eq!(params, vec![json!(["United Airlines", "Lufthansa"])]);
}

#[test]
fn in_empty_matches_nothing() {
    let (clause, params) = compile(&Predicate::r#in("name", Vec::<String>::new()));
    assert_eq!(clause, " WHERE 1 = 0");
    assert!(params.is_empty());
}

#[test]
fn not_in_single_element_degrades_to_ne() {
    let (clause, params) = compile(&Predicate::not_in("name", ["United Airlines"]));
    assert_eq!(clause, " WHERE name != $1");
    assert_eq!(params, vec![json!("United Airlines")]);
}

#[test]
fn not_in_many_elements() {
    let (clause, _) = compile(&Predicate::not_in("name", ["Fly By Night", "Sleep By Day"]));
    assert_eq!(clause, " WHERE not( (name in $1) )");
}

#[test]
fn is_null_and_is_not_null_fragments() {
    let (clause, _) = compile(&Predicate::is_null("hqCountry"));
    assert_eq!(clause, " WHERE hqCountry is null");
    let (clause, _) = compile(&Predicate::is_not_null("hqCountry"));
    assert_eq!(clause, " WHERE hqCountry is not null");
}

#[test]
fn exists_is_not_missing() {
    let (clause, _) = compile(&Predicate::exists("name"));
    assert_eq!(clause, " WHERE name is not missing");
}

#[test]
fn is_empty_composes_empty_string_with_null() {
    let (clause, params) = compile(&Predicate::is_empty("hqCountry"));
    assert_eq!(clause, " WHERE   (hqCountry = $1) or   (hqCountry is null)");
    assert_eq!(params, vec![json!("")]);
}

#[test]
fn length() {
    let (clause, params) = compile(&Predicate::length_eq("name", 15));
    assert_eq!(clause, " WHERE LENGTH(name) = $1");
    assert_eq!(params, vec![json!(15)]);
}

#[test]
fn elem_match() {
    let predicate = Predicate::elem_match(
        "routes",
        vec![Predicate::eq("airline", "UA"), Predicate::eq("stops", 0)],
    );
    let (clause, params) = compile(&predicate);
    assert_eq!(
        clause,
        " WHERE any x in routes satisfies   (x.airline = $1) and   (x.stops = $2) end"
    );
    assert_eq!(params, vec![json!("UA"), json!(0)]);
}

#[test]
fn elem_match_without_conditions_is_malformed() {
    let err = N1qlSerializer::new()
        .compile(&Predicate::elem_match("routes", vec![]))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedExpression(_)), "got {err:?}");
}

#[test]
fn geo_operators_are_unsupported_at_compile_time() {
    let serializer = N1qlSerializer::new();
    for (predicate, name) in [
        (Predicate::near("location", 1.0, 2.0), "NEAR"),
        (Predicate::near_sphere("location", 1.0, 2.0), "NEAR_SPHERE"),
        (
            Predicate::geo_within_box("location", 0.0, 0.0, 1.0, 1.0),
            "GEO_WITHIN_BOX",
        ),
    ] {
        let err = serializer.compile(&predicate).unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedOperator(op) if op == name),
            "got {err:?}"
        );
    }
}

#[test]
fn nested_path_renders_dotted() {
    let (clause, _) = compile(&Predicate::eq("homeAirport.id", "airport:9"));
    assert_eq!(clause, " WHERE homeAirport.id = $1");
}

#[test]
fn empty_path_is_rejected() {
    let err = N1qlSerializer::new()
        .compile(&Predicate::eq("", "x"))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFieldPath(_)), "got {err:?}");
}

#[test]
fn placeholders_are_dense_and_ordered() {
    let predicate = Predicate::or(vec![
        Predicate::eq("name", "a").and_then(Predicate::between("name", "b", "c")),
        Predicate::starts_with_ignore_case("name", "d").not(),
        Predicate::r#in("hqCountry", ["e", "f"]),
    ]);
    let compiled = N1qlSerializer::new().compile(&predicate).unwrap();

    let re = regex::Regex::new(r"\$(\d+)").unwrap();
    let ordinals: Vec<usize> = re
        .captures_iter(compiled.clause())
        .map(|c| c[1].parse().unwrap())
        .collect();
    assert_eq!(ordinals.len(), compiled.params().len());
    assert_eq!(ordinals, (1..=compiled.params().len()).collect::<Vec<_>>());
}

#[test]
fn export_is_human_readable() {
    let compiled = N1qlSerializer::new()
        .compile(&Predicate::eq("name", "United Airlines"))
        .unwrap();
    assert_eq!(
        compiled.export(),
        " WHERE name = $1 [$1=\"United Airlines\"]"
    );
}

#[test]
fn sort_and_projection_compile() {
    let serializer = N1qlSerializer::new();
    let sort = serializer
        .compile_sort(&[
            OrderSpecifier::asc("name"),
            OrderSpecifier::desc("homeAirport.iata"),
        ])
        .unwrap();
    assert_eq!(
        sort,
        vec![
            ("name".to_string(), SortDirection::Asc),
            ("homeAirport.iata".to_string(), SortDirection::Desc),
        ]
    );

    let projection = Projection::new()
        .field("airline", "name")
        .field("country", "hqCountry");
    let fields = serializer.compile_projection(&projection).unwrap();
    assert_eq!(fields.get("airline").map(String::as_str), Some("name"));
    assert_eq!(fields.get("country").map(String::as_str), Some("hqCountry"));
}
