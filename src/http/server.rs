use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio;
use tokio::sync::oneshot::Receiver;

use hyper::{Body, Method, Request, Response, Server, StatusCode};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};

use serde::{Deserialize, Serialize};

use image::{ImageBuffer, Luma};
use log::{error, info};

use crate::dat::{ContentKey, DatError, Fixture, TerrainLayer};
use crate::world::WorldArchive;


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CellFixtures {
    pub x: u32,
    pub y: u32,
    pub version: u32,
    pub fixtures: Vec<Fixture>,
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub index: u32,
    pub row_count: u32,
    pub row_size: u32,
}


#[derive(Serialize, Deserialize, Debug)]
pub enum ApiRequest {
    WorldToc {world: u32, },
    CellKey {world: u32, layer: u32, x: u32, y: u32, },

    Fixtures {world: u32, layer: u32, x: u32, y: u32, },
    WorldFixtures {world: u32, layer: u32, },

    TerrainInfo {world: u32, layer: u32, x: u32, y: u32, },
    RenderLayer {world: u32, layer: u32, x: u32, y: u32, index: usize, },
}


#[derive(Serialize, Deserialize, Debug)]
pub enum ApiResponse {
    Error { err: String, },
    TocReply { size_x: u32, size_y: u32, },
    KeyReply { key: u64, filename: String, },
    FixturesReply { version: u32, fixtures: Vec<Fixture>, },
    WorldFixturesReply { cells: Vec<CellFixtures>, },
    TerrainReply { version: u16, layer_sizes: Vec<u32>, layers: Vec<Option<LayerInfo>>, },
    #[serde(skip_serializing, skip_deserializing)]
    RenderReply { image: ImageBuffer<Luma<u8>, Vec<u8>> },
}


/// grayscale picture of a terrain layer, one pixel per byte, one image row per layer row
pub fn render_layer(layer: &TerrainLayer) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
    if layer.row_count == 0 || layer.row_size == 0 {
        return None;
    }
    ImageBuffer::from_raw(layer.row_size, layer.row_count, layer.data.clone())
}


#[derive(Clone)]
struct ApiHandler {
    archive: Arc<WorldArchive>,
}


impl ApiHandler {
    pub fn new(archive: Arc<WorldArchive>) -> Self {
        Self {
            archive
        }
    }


    async fn handle_request(&self, req: Request<Body>) -> Result<Response<Body>, Infallible> {
        // reading the request body as bytes
        let body_bytes = match hyper::body::to_bytes(req.into_body()).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Api::error body parsing - {err}");
                let response = ApiResponse::Error {err: format!("Failed to read request body: {}", err) };
                return Self::serialize_response(&response);
            }
        };

        // trying to deserialize it from json to an enum instance `ApiRequest`
        let api_response = match serde_json::from_slice::<ApiRequest>(&body_bytes) {
            Ok(api_request) => self.execute(api_request).await,

            // parsing failed, make a response that will include a description of the error
            Err(err) => {
                error!("Api::error request parsing - {err}");

                ApiResponse::Error {err: format!("Failed to parse request body: {err}") }
            }
        };

        Self::serialize_response(&api_response)
    }


    async fn execute(&self, api_request: ApiRequest) -> ApiResponse {
        match api_request {
            ApiRequest::WorldToc {world}
                => self.handle_world_toc(world).await,
            ApiRequest::CellKey {world, layer, x, y}
                => self.handle_cell_key(world, layer, x, y),

            ApiRequest::Fixtures {world, layer, x, y}
                => self.handle_fixtures(world, layer, x, y).await,
            ApiRequest::WorldFixtures {world, layer}
                => self.handle_world_fixtures(world, layer).await,

            ApiRequest::TerrainInfo {world, layer, x, y}
                => self.handle_terrain_info(world, layer, x, y).await,
            ApiRequest::RenderLayer {world, layer, x, y, index}
                => self.handle_render_layer(world, layer, x, y, index).await,
        }
    }


    fn json_response(body: String) -> Response<Body> {
        let mut response = Response::new(Body::from(body));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }


    fn serialize_response(response: &ApiResponse) -> Result<Response<Body>, Infallible> {
        match response {
            // special case, RenderReply return png image, not json
            ApiResponse::RenderReply { image } => {
                let mut write_buffer = Cursor::new(Vec::with_capacity(image.width() as usize *image.height() as usize));
                if let Err(err) = image.write_to(&mut write_buffer, image::ImageOutputFormat::Png) {
                    error!("Api::error png encoding - {err}");
                    return Self::serialize_response(&ApiResponse::Error { err: format!("Failed to encode image: {err}") });
                }
                let image_buffer = write_buffer.into_inner();
                let content_length = HeaderValue::from(image_buffer.len());

                let mut response = Response::new(Body::from(image_buffer));
                let headers = response.headers_mut();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
                headers.insert(CONTENT_LENGTH, content_length);
                Ok(response)
            }

            // common case, serialize reply to json
            _ => {
                let response_body = serde_json::to_string(&response)
                    .unwrap_or_else(|err| format!(r#"{{"Error":{{"err":"Failed to serialize response: {err}"}}}}"#));

                Ok(Self::json_response(response_body))
            }
        }
    }


    /// decoders are synchronous, they run on the blocking pool
    async fn blocking<F>(&self, job: F) -> ApiResponse
    where
        F: FnOnce(&WorldArchive) -> Result<ApiResponse, DatError> + Send + 'static,
    {
        let archive = self.archive.clone();
        match tokio::task::spawn_blocking(move || job(&archive)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!("Api::error decoding - {err}");
                ApiResponse::Error { err: err.to_string() }
            }
            Err(err) => {
                error!("Api::error decoder task - {err}");
                ApiResponse::Error { err: format!("Decoder task failed: {err}") }
            }
        }
    }

    // Handlers
    async fn handle_world_toc(&self, world: u32) -> ApiResponse {
        info!("Api::world_toc world {world}");
        self.blocking(move |archive| {
            let toc = archive.toc(world)?;
            Ok(ApiResponse::TocReply { size_x: toc.size_x, size_y: toc.size_y })
        }).await
    }


    fn handle_cell_key(&self, world: u32, layer: u32, x: u32, y: u32) -> ApiResponse {
        info!("Api::cell_key world {world}, layer {layer}, cell {x}, {y}");
        let key = ContentKey::world_cell(world, layer, x, y);
        ApiResponse::KeyReply { key: key.0, filename: key.filename() }
    }


    async fn handle_fixtures(&self, world: u32, layer: u32, x: u32, y: u32) -> ApiResponse {
        info!("Api::fixtures world {world}, layer {layer}, cell {x}, {y}");
        self.blocking(move |archive| {
            let file = archive.fixtures(world, layer, x, y)?;
            Ok(ApiResponse::FixturesReply { version: file.version, fixtures: file.into_fixtures() })
        }).await
    }


    async fn handle_world_fixtures(&self, world: u32, layer: u32) -> ApiResponse {
        info!("Api::world_fixtures world {world}, layer {layer}");
        self.blocking(move |archive| {
            let cells = archive.world_fixtures(world, layer)?
                .into_iter()
                .map(|(x, y, file)| CellFixtures { x, y, version: file.version, fixtures: file.into_fixtures() })
                .collect();
            Ok(ApiResponse::WorldFixturesReply { cells })
        }).await
    }


    async fn handle_terrain_info(&self, world: u32, layer: u32, x: u32, y: u32) -> ApiResponse {
        info!("Api::terrain_info world {world}, layer {layer}, cell {x}, {y}");
        self.blocking(move |archive| {
            let file = archive.terrain(world, layer, x, y)?;
            let layers = file.layers.iter()
                .map(|l| l.as_ref().map(|l| LayerInfo { index: l.index, row_count: l.row_count, row_size: l.row_size }))
                .collect();
            Ok(ApiResponse::TerrainReply { version: file.version, layer_sizes: file.layer_sizes, layers })
        }).await
    }


    async fn handle_render_layer(&self, world: u32, layer: u32, x: u32, y: u32, index: usize) -> ApiResponse {
        info!("Api::render_layer world {world}, layer {layer}, cell {x}, {y}, terrain layer {index}");
        self.blocking(move |archive| {
            let file = archive.terrain(world, layer, x, y)?;
            let response = match file.layer(index).and_then(render_layer) {
                Some(image) => ApiResponse::RenderReply { image },
                None => ApiResponse::Error { err: format!("terrain layer {index} is absent or empty") },
            };
            Ok(response)
        }).await
    }
}


async fn handle_request(api: Arc<ApiHandler>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() == Method::POST && req.uri().path() == "/api/" {
        let api = api.as_ref();
        return api.handle_request(req).await;
    }

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_FOUND;

    Ok(response)
}


async fn http_svc(archive: Arc<WorldArchive>, addr: SocketAddr, http_stop: Receiver<()>) {
    let api_handler = Arc::new(ApiHandler::new(archive));

    let make_service = make_service_fn(move |_conn| {
        let api = api_handler.clone(); // clone the Arc reference
        let service = service_fn(move |req| {
            handle_request(api.clone(), req) // use the Arc reference
        });

        async move { Ok::<_, Infallible>(service) }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder,
        Err(err) => {
            error!("unable to bind {addr}: {err}");
            return;
        }
    };

    let server = server
        .serve(make_service)
        .with_graceful_shutdown(async {
            http_stop.await.ok();
        });

    info!("Listening on http://{}", addr);
    if let Err(e) = server.await {
        error!("server error: {}", e);
    } else {
        info!("server stopped successfully")
    }
}

pub fn http_server_service(archive: Arc<WorldArchive>, addr: SocketAddr, http_stop: Receiver<()>) {
    // start http service in single thread runtime
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("http_server_thread")
        .build();

    let rt = match rt {
        Ok(rt) => rt,
        Err(err) => {
            error!("unable to start http runtime: {err}");
            return;
        }
    };

    // block thread while service is running
    rt.block_on(http_svc(archive, addr, http_stop));
}
