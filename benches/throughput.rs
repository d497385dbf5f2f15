use criterion::{criterion_group, criterion_main, Criterion};
use decoy::response::Response;
use decoy::router::Router;
use decoy::service::MockService;
use decoy::MockRequest;
use http::Method;
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

/// Shop API with a mix of literal, typed and deeply nested routes.
fn shop_spec() -> &'static str {
    r#"openapi: 3.1.0
info:
  title: Bench Shop
  version: "1.0.0"
paths:
  /health:
    get:
      responses:
        "200": { description: OK }
  /products:
    get:
      operationId: list_products
      responses:
        "200": { description: OK }
    post:
      operationId: create_product
      responses:
        "201": { description: Created }
  /products/{id}:
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
    get:
      operationId: get_product
      responses:
        "200":
          description: OK
          content:
            application/json:
              schema:
                type: object
                properties:
                  id: { type: string }
                  tag: { type: string }
    delete:
      operationId: delete_product
      responses:
        "204": { description: Deleted }
  /products/{id}/reviews/{review}:
    get:
      operationId: product_review
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
        - { name: review, in: path, required: true, schema: { type: string, format: uuid } }
      responses:
        "200": { description: OK }
  /stores/{region}/aisles/{aisle}/shelves/{shelf}/slots/{slot}:
    get:
      operationId: shelf_slot
      responses:
        "200": { description: OK }
  /orders/{order}/lines/{line}/shipments/{shipment}:
    post:
      operationId: ship_line
      responses:
        "202": { description: Accepted }
  /search/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}:
    get:
      operationId: wide_search
      responses:
        "200": { description: OK }
"#
}

fn shop_router() -> Router {
    let doc: serde_json::Value = serde_yaml::from_str(shop_spec()).unwrap();
    let router = Router::new();
    for def in decoy::openapi::routes_from_value(&doc).unwrap() {
        router.add_route_def(def).unwrap();
    }
    router
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = shop_router();
    let test_paths = [
        (Method::GET, "/products/123"),
        (Method::GET, "/products/123/reviews/0b4a1b9e-3f8a-4c1e-9d2b-7a6f5e4d3c2b"),
        (Method::GET, "/stores/eu/aisles/4/shelves/2/slots/9"),
        (Method::POST, "/orders/1/lines/2/shipments/3"),
        (Method::GET, "/search/1/2/3/4/5/6/7/8"),
    ];
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in &test_paths {
                black_box(router.match_parts(method, path));
            }
        })
    });
    c.bench_function("route_miss", |b| {
        b.iter(|| black_box(router.match_parts(&Method::GET, "/nowhere/to/be/found")))
    });
}

fn bench_service_handle(c: &mut Criterion) {
    let router = Arc::new(shop_router());
    let route = router.get_route(&"get_product".into()).unwrap();
    route
        .add_response(Response::new(200, json!({"id": "{{id}}", "tag": "{{tag}}"})).unwrap())
        .unwrap();
    let service = MockService::new(router);
    let request = MockRequest::new(Method::GET, "/products/42?tag=sale");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    c.bench_function("service_handle", |b| {
        b.iter(|| black_box(runtime.block_on(service.handle(&request))))
    });
}

criterion_group!(benches, bench_route_throughput, bench_service_handle);
criterion_main!(benches);
