//! services/api/src/bin/openapi.rs
//!
//! A small utility binary that prints the OpenAPI specification as JSON,
//! for generating clients without starting the server.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

fn main() {
    match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI specification: {}", e);
            std::process::exit(1);
        }
    }
}
