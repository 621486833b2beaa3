use anyhow::Result;
use utoipa::OpenApi;

use crate::cli::OpenApiFormat;
use crate::schemas::ApiDoc;

/// Write the OpenAPI document to stdout.
pub fn print_openapi(format: OpenApiFormat) -> Result<()> {
    let openapi = ApiDoc::openapi();
    let document = match format {
        OpenApiFormat::Json => serde_json::to_string_pretty(&openapi)?,
        OpenApiFormat::Yaml => serde_yaml::to_string(&openapi)?,
    };
    println!("{}", document);
    Ok(())
}
