// tests/schema_tests.rs
// Integration tests for declarative schema evaluation

#[cfg(test)]
mod tests {
    use request_validator::{
        FieldError, FieldSchema, Location, RequestData, RuleSpec, Schema, ValidationContext,
        ValidatorConfig, ValidatorError,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    const NOT_INT: &str = "Parameter is not an integer.";
    const OUT_OF_RANGE: &str = "Parameter is out of range or not int.";

    fn location_schema() -> Schema {
        Schema::from_value(&json!({
            "testparam": {
                "in": "params",
                "notEmpty": true,
                "isInt": { "errorMessage": NOT_INT }
            },
            "testheader": {
                "in": "headers",
                "notEmpty": true,
                "isInt": { "errorMessage": NOT_INT }
            },
            "testquery": {
                "in": "query",
                "notEmpty": true,
                "isInt": { "options": [{ "min": 2, "max": 10 }], "errorMessage": OUT_OF_RANGE }
            },
            "skipped": {
                "in": "notSupportedOne",
                "notEmpty": true,
                "isInt": { "options": [{ "min": 2, "max": 10 }], "errorMessage": OUT_OF_RANGE }
            },
            "numInQuery": {
                "notEmpty": true,
                "isInt": { "options": [{ "min": 0, "max": 665 }], "errorMessage": OUT_OF_RANGE }
            }
        }))
        .unwrap()
    }

    fn context(param: &str, testquery: &str, num_in_query: &str) -> ValidationContext {
        ValidationContext::new(
            Arc::new(ValidatorConfig::default()),
            RequestData::new()
                .with_params(json!({ "testparam": param }))
                .with_query(json!({
                    "testquery": testquery,
                    "skipped": "34",
                    "numInQuery": num_in_query
                }))
                .with_headers(json!({ "testheader": "45" })),
        )
    }

    fn messages(ctx: &ValidationContext) -> Vec<String> {
        ctx.validation_errors(false)
            .map(|errors| {
                errors
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|error| error["msg"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_schema_with_field_locations_passes() {
        let mut ctx = context("25", "6", "0");
        ctx.check_schema(&location_schema()).unwrap();
        assert!(ctx.validation_errors(false).is_none());
    }

    #[test]
    fn test_schema_param_not_integer() {
        let mut ctx = context("ImNot", "6", "0");
        ctx.check_schema(&location_schema()).unwrap();
        assert_eq!(messages(&ctx), vec![NOT_INT]);
    }

    #[test]
    fn test_schema_query_out_of_range() {
        let mut ctx = context("25", "20", "0");
        ctx.check_schema(&location_schema()).unwrap();
        assert_eq!(messages(&ctx), vec![OUT_OF_RANGE]);
    }

    #[test]
    fn test_schema_all_invalid() {
        let mut ctx = context("ImNot", "20", "0");
        ctx.check_schema(&location_schema()).unwrap();
        assert_eq!(messages(&ctx), vec![NOT_INT, OUT_OF_RANGE]);
    }

    #[test]
    fn test_schema_default_query_location() {
        let mut ctx = context("25", "6", "666");
        ctx.check_schema_in(Location::Query, &location_schema()).unwrap();
        assert_eq!(messages(&ctx), vec![OUT_OF_RANGE]);
    }

    #[test]
    fn test_schema_default_location_without_field() {
        for location in [Location::Params, Location::Body, Location::Headers] {
            let mut ctx = context("25", "6", "1");
            ctx.check_schema_in(location, &location_schema()).unwrap();
            assert_eq!(
                messages(&ctx),
                vec!["Invalid param", OUT_OF_RANGE],
                "default location {}",
                location
            );
        }
    }

    #[test]
    fn test_field_location_does_not_leak_to_next_field() {
        let schema = Schema::from_value(&json!({
            "id": { "in": "params", "isInt": true },
            "page": { "isInt": true }
        }))
        .unwrap();

        let mut ctx = ValidationContext::new(
            Arc::new(ValidatorConfig::default()),
            RequestData::new()
                .with_params(json!({ "id": "1" }))
                .with_body(json!({ "page": "2" })),
        );
        ctx.check_schema_in(Location::Body, &schema).unwrap();
        assert!(ctx.validation_errors(false).is_none());
    }

    #[test]
    fn test_age_scenario() {
        let schema = Schema::from_value(&json!({
            "age": {
                "in": "params",
                "isInt": { "options": [{ "min": 0, "max": 120 }], "errorMessage": "bad age" }
            }
        }))
        .unwrap();

        let mut ctx = ValidationContext::new(
            Arc::new(ValidatorConfig::default()),
            RequestData::new().with_params(json!({ "age": "200" })),
        );
        ctx.check_schema(&schema).unwrap();

        let errors: Vec<FieldError> =
            serde_json::from_value(ctx.validation_errors(false).unwrap().to_value()).unwrap();
        assert_eq!(errors, vec![FieldError::new("age", "bad age", Some(json!("200")))]);
    }

    #[test]
    fn test_builder_schema_matches_json_schema() {
        let built = Schema::new().field(
            "age",
            FieldSchema::new().location(Location::Params).rule(
                "isInt",
                RuleSpec::new()
                    .options(vec![json!({ "min": 0, "max": 120 })])
                    .message("bad age"),
            ),
        );
        let parsed = Schema::from_value(&json!({
            "age": {
                "in": "params",
                "isInt": { "options": [{ "min": 0, "max": 120 }], "errorMessage": "bad age" }
            }
        }))
        .unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_unknown_rule_is_configuration_error() {
        let schema = Schema::new().field("a", FieldSchema::new().check("isWidget"));
        let mut ctx = ValidationContext::new(
            Arc::new(ValidatorConfig::default()),
            RequestData::new().with_query(json!({ "a": "1" })),
        );

        assert_eq!(
            ctx.check_schema(&schema),
            Err(ValidatorError::UnknownValidator("isWidget".into()))
        );
        assert!(ctx.validation_errors(false).is_none());
    }

    #[test]
    fn test_custom_validator_in_schema() {
        let config = ValidatorConfig::builder()
            .custom_validator("isArray", |input: &request_validator::Input, _: &[Value]| {
                matches!(input.raw(), Some(Value::Array(_)))
            })
            .build();
        let schema = Schema::from_value(&json!({
            "tags": { "isArray": { "errorMessage": "tags must be a list" } }
        }))
        .unwrap();

        let mut ctx = ValidationContext::new(
            Arc::new(config),
            RequestData::new().with_body(json!({ "tags": "solo" })),
        );
        ctx.check_schema(&schema).unwrap();
        assert_eq!(messages(&ctx), vec!["tags must be a list"]);
    }

    mod optional {
        use super::*;

        const MESSAGE: &str = "Parameter is not an integer";

        fn run(query: Value) -> Vec<String> {
            let schemas = [
                json!({ "optional_param": { "isInt": { "errorMessage": MESSAGE }, "optional": true } }),
                json!({
                    "optional_falsy_param": {
                        "optional": { "options": [{ "checkFalsy": true }] },
                        "isInt": { "errorMessage": MESSAGE }
                    }
                }),
                json!({
                    "optional_falsy_param_array": {
                        "optional": { "options": { "checkFalsy": true } },
                        "isInt": { "errorMessage": MESSAGE }
                    }
                }),
            ];

            let mut ctx = ValidationContext::new(
                Arc::new(ValidatorConfig::default()),
                RequestData::new().with_query(query),
            );
            for schema in &schemas {
                ctx.check_schema(&Schema::from_value(schema).unwrap()).unwrap();
            }
            messages(&ctx)
        }

        #[test]
        fn test_absent_optional_params_pass() {
            assert!(run(json!({})).is_empty());
            assert!(run(json!({ "other_param": "test" })).is_empty());
        }

        #[test]
        fn test_empty_optional_param_fails() {
            assert_eq!(run(json!({ "optional_param": "" })), vec![MESSAGE]);
            assert_eq!(run(json!({ "optional_param": "test" })), vec![MESSAGE]);
        }

        #[test]
        fn test_valid_optional_param_passes() {
            assert!(run(json!({ "optional_param": "123" })).is_empty());
        }

        #[test]
        fn test_check_falsy_skips_empty_values() {
            assert!(run(json!({ "optional_falsy_param": "" })).is_empty());
            assert!(run(json!({ "optional_falsy_param_array": "" })).is_empty());
        }

        #[test]
        fn test_check_falsy_still_validates_present_values() {
            assert_eq!(run(json!({ "optional_falsy_param": "hello" })), vec![MESSAGE]);
            assert_eq!(run(json!({ "optional_falsy_param_array": "hello" })), vec![MESSAGE]);
        }
    }
}
