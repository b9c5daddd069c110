// crates/gateway-topology-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the `config example` command.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for gateway topology configuration. The `[topology]`
//! section spells out the reference topology field by field, so it parses to
//! the same declaration as an empty section.

/// Returns a canonical example `gateway-topology.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[environment]
account = "123456789012"
region = "ap-northeast-1"

[audit]
sink = "stderr"

[topology]
isolation = "nested"
nested_unit_name = "FastapiStack"
public_docs_routes = true

[topology.identity]
name = "fastapi-sample-lambda-role"
trusted_principal = "lambda.amazonaws.com"
description = "Execution role for the sample function with log-write access"
policy_name = "loggingRole"

[[topology.identity.statements]]
effect = "allow"
actions = ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"]
resources = ["*"]

[[topology.packages]]
name = "fastapi_sample_layer"
bundle = "lambda_layer"
compatible_runtimes = ["python3.11"]
description = "Web framework and adapter libraries for the function"

[topology.function]
name = "fastapi_sample"
runtime = "python3.11"
entry_point = "app.handler"
bundle = "src"
packages = ["fastapi_sample_layer"]

[topology.gateway]
name = "fastapi-sample-apigw"
endpoint = "regional"
api_key_source = "header"

[topology.gateway.cors]
allow_origins = ["*"]
allow_methods = ["OPTIONS", "GET", "PUT", "POST", "DELETE", "PATCH", "HEAD"]
allow_headers = [
  "Content-Type",
  "X-Amz-Date",
  "Authorization",
  "X-Api-Key",
  "X-Amz-Security-Token",
  "X-Amz-User-Agent",
]
status_code = 200

[[topology.gateway.routes]]
path = "/{proxy+}"
method = "GET"
api_key_required = true

[topology.primary_stage]
name = "dev"

[topology.primary_stage.logging]
level = "info"
data_trace = true
metrics_enabled = true

[[topology.stages]]
name = "prod"

[topology.stages.logging]
level = "info"
data_trace = false
metrics_enabled = false

[[topology.stages.grants]]
method = "GET"
route = "/{proxy+}"

[[topology.api_keys]]
name = "fastapi-sample-apikey"
enabled = true

[[topology.access_plans]]
name = "fastapi-sample-usageplan"
keys = ["fastapi-sample-apikey"]
stages = ["dev", "prod"]

[topology.access_plans.limits]
mode = "unlimited"
"#,
    )
}
