use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, put, web};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use rs_markov_core::{ActiveChain, ChainConfig, ChainError};

const DEFAULT_CONFIG_PATH: &str = "./config/chain_config.json";

/// Query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>,
}

/// Maps core errors onto HTTP statuses.
fn error_response(error: ChainError) -> HttpResponse {
	let body = error.to_string();
	match error {
		ChainError::InvalidName(_) | ChainError::Config(_) => HttpResponse::BadRequest().body(body),
		ChainError::CorpusNotFound(_) | ChainError::ModelNotFound(_) => HttpResponse::NotFound().body(body),
		ChainError::ModelEmpty | ChainError::ModelStalled { .. } | ChainError::GenerationTooLong { .. } => {
			HttpResponse::Conflict().body(body)
		}
		ChainError::Io(_) | ChainError::Format(_) | ChainError::Malformed(_) | ChainError::LockPoisoned => {
			log::error!("{body}");
			HttpResponse::InternalServerError().body(body)
		}
	}
}

/// Runs a job that takes the writer lock or touches disk off the async workers.
async fn blocking<T, F>(chain: web::Data<ActiveChain>, job: F) -> Result<T, HttpResponse>
where
	T: Send + 'static,
	F: FnOnce(&ActiveChain) -> Result<T, ChainError> + Send + 'static,
{
	match web::block(move || job(&chain)).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(e)) => Err(error_response(e)),
		Err(_) => Err(HttpResponse::InternalServerError().body("Worker failed")),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates one message from the active chain. A `seed` makes the
/// output reproducible for a given model.
#[get("/v1/generate")]
async fn get_generated(chain: web::Data<ActiveChain>, query: web::Query<GenerateParams>) -> impl Responder {
	let result = match query.seed {
		Some(seed) => chain.generate_text(&mut StdRng::seed_from_u64(seed)),
		None => chain.generate_text(&mut rand::rng()),
	};

	match result {
		Ok(text) => HttpResponse::Ok().body(text),
		Err(e) => error_response(e),
	}
}

#[get("/v1/corpora")]
async fn get_corpora(chain: web::Data<ActiveChain>) -> impl Responder {
	match chain.list_corpora() {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(e) => error_response(e),
	}
}

#[get("/v1/models")]
async fn get_models(chain: web::Data<ActiveChain>) -> impl Responder {
	match chain.list_models() {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(e) => error_response(e),
	}
}

#[get("/v1/current")]
async fn get_current(chain: web::Data<ActiveChain>) -> impl Responder {
	match chain.current_name() {
		Ok(name) => HttpResponse::Ok().body(name),
		Err(e) => error_response(e),
	}
}

#[put("/v1/load_model")]
async fn put_model(chain: web::Data<ActiveChain>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty model name"),
	};

	let response = format!("Swapped chain to {name}");
	match blocking(chain, move |c| c.switch_to(&name)).await {
		Ok(()) => HttpResponse::Ok().body(response),
		Err(response) => response,
	}
}

#[post("/v1/record")]
async fn post_record(chain: web::Data<ActiveChain>, body: String) -> impl Responder {
	match blocking(chain, move |c| c.record(&body)).await {
		Ok(n) => HttpResponse::Ok().body(format!("Recorded {n} lines")),
		Err(response) => response,
	}
}

#[put("/v1/update")]
async fn put_update(chain: web::Data<ActiveChain>) -> impl Responder {
	match blocking(chain, |c| c.update_from_recorded()).await {
		Ok(n) => HttpResponse::Ok().body(format!("Studied {n} new messages")),
		Err(response) => response,
	}
}

#[put("/v1/reset")]
async fn put_reset(chain: web::Data<ActiveChain>) -> impl Responder {
	match blocking(chain, |c| c.reset()).await {
		Ok(n) => HttpResponse::Ok().body(format!("Reset with {n} messages")),
		Err(response) => response,
	}
}

/// Main entry point for the server.
///
/// Reads the config (first argument, `RS_MARKOV_CONFIG`, or
/// `./config/chain_config.json`), activates the default corpus and
/// serves the chain over HTTP.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config_path = std::env::args()
		.nth(1)
		.or_else(|| std::env::var("RS_MARKOV_CONFIG").ok())
		.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());

	let config = ChainConfig::load_or_default(&config_path).map_err(std::io::Error::other)?;
	let chain = ActiveChain::open(&config).map_err(std::io::Error::other)?;
	log::info!(
		"Serving chain {} on {}:{}",
		chain.current_name().map_err(std::io::Error::other)?,
		config.bind_address,
		config.port
	);
	let shared_chain = web::Data::new(chain);

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.wrap(Logger::default())
			.app_data(shared_chain.clone())
			.service(get_generated)
			.service(get_corpora)
			.service(get_models)
			.service(get_current)
			.service(put_model)
			.service(post_record)
			.service(put_update)
			.service(put_reset)
	})
		.bind((config.bind_address.as_str(), config.port))?
		.run()
		.await
}


#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::body::to_bytes;
	use actix_web::test;
	use std::fs;

	fn chain(label: &str) -> ActiveChain {
		let root = std::env::temp_dir().join(format!("rs-markov-server-{}-{}", label, std::process::id()));
		let _ = fs::remove_dir_all(&root);
		fs::create_dir_all(root.join("data")).unwrap();
		fs::write(root.join("data").join("beemovie.txt"), "ya like jazz\n").unwrap();
		let config = ChainConfig {
			corpus_dir: root.join("data"),
			model_dir: root.join("markov_chains"),
			recorded_data_path: root.join("recorded_data.log"),
			..ChainConfig::default()
		};
		ActiveChain::open(&config).unwrap()
	}

	#[actix_web::test]
	async fn test_record_then_update() {
		let app = test::init_service(
			App::new()
				.app_data(web::Data::new(chain("record")))
				.service(post_record)
				.service(put_update),
		)
		.await;

		let request = test::TestRequest::post()
			.uri("/v1/record")
			.set_payload("ya like bees\n\nya know")
			.to_request();
		let response = test::call_service(&app, request).await;
		assert!(response.status().is_success());
		assert_eq!(to_bytes(response.into_body()).await.unwrap(), "Recorded 2 lines");

		let request = test::TestRequest::put().uri("/v1/update").to_request();
		let response = test::call_service(&app, request).await;
		assert!(response.status().is_success());
		assert_eq!(to_bytes(response.into_body()).await.unwrap(), "Studied 2 new messages");
	}
}
