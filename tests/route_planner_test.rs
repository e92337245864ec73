//! Integration tests for route assignment and delivery-sequence
//! maintenance.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

use fulfillment_api::errors::ServiceError;
use fulfillment_api::models::BillingType;
use fulfillment_api::services::route_planner::{MoveDirection, RoutePlannerService};

async fn three_routed_orders(app: &TestApp) -> (Uuid, [Uuid; 3]) {
    let client = app.seed_client("Granja Sur", BillingType::Facturable).await;
    let route = app.create_route().await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = app.create_order(client.id, &[(4, dec!(500))]).await;
        app.make_ready(order.id).await;
        ids.push(order.id);
    }
    app.services
        .route_planner
        .assign(route.id, ids.clone())
        .await
        .unwrap();
    (route.id, [ids[0], ids[1], ids[2]])
}

fn sequences(route_orders: &[fulfillment_api::models::route_order_entity::Model]) -> Vec<i32> {
    route_orders.iter().map(|ro| ro.delivery_sequence).collect()
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn assignment_appends_in_dense_sequence() {
    let app = TestApp::new().await;
    let (route_id, _) = three_routed_orders(&app).await;

    let (_, route_orders) = app
        .services
        .route_planner
        .get_route_with_orders(route_id)
        .await
        .unwrap();
    assert_eq!(sequences(&route_orders), vec![1, 2, 3]);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn an_order_cannot_be_routed_twice() {
    let app = TestApp::new().await;
    let (_, [first, _, _]) = three_routed_orders(&app).await;
    let other_route = app.create_route().await;

    let err = app
        .services
        .route_planner
        .assign(other_route.id, vec![first])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyAssigned(id) if id == first));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn unreviewed_orders_cannot_be_routed() {
    let app = TestApp::new().await;
    let client = app.seed_client("Granja Sur", BillingType::Facturable).await;
    let route = app.create_route().await;
    let order = app.create_order(client.id, &[(4, dec!(500))]).await;

    let err = app
        .services
        .route_planner
        .assign(route.id, vec![order.id])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn moving_the_third_order_up_yields_1_3_2() {
    let app = TestApp::new().await;
    let (route_id, [a, b, c]) = three_routed_orders(&app).await;

    let resequenced = app
        .services
        .route_planner
        .reorder(route_id, c, MoveDirection::Up)
        .await
        .unwrap();

    // Visiting order is now a, c, b with sequences still dense.
    let visiting: Vec<Uuid> = resequenced.iter().map(|ro| ro.order_id).collect();
    assert_eq!(visiting, vec![a, c, b]);
    assert!(RoutePlannerService::is_dense_permutation(&sequences(
        &resequenced
    )));
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn boundary_moves_change_nothing() {
    let app = TestApp::new().await;
    let (route_id, [a, _, c]) = three_routed_orders(&app).await;

    let up = app
        .services
        .route_planner
        .reorder(route_id, a, MoveDirection::Up)
        .await
        .unwrap();
    assert_eq!(sequences(&up), vec![1, 2, 3]);

    let down = app
        .services
        .route_planner
        .reorder(route_id, c, MoveDirection::Down)
        .await
        .unwrap();
    assert_eq!(sequences(&down), vec![1, 2, 3]);
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn sequence_stays_dense_under_many_moves() {
    let app = TestApp::new().await;
    let (route_id, [a, b, c]) = three_routed_orders(&app).await;

    for (order_id, direction) in [
        (a, MoveDirection::Down),
        (c, MoveDirection::Up),
        (b, MoveDirection::Up),
        (a, MoveDirection::Down),
        (c, MoveDirection::Down),
    ] {
        let resequenced = app
            .services
            .route_planner
            .reorder(route_id, order_id, direction)
            .await
            .unwrap();
        assert!(RoutePlannerService::is_dense_permutation(&sequences(
            &resequenced
        )));
    }
}

#[tokio::test]
#[ignore = "requires SQLite integration environment"]
async fn unassigned_ready_orders_shrinks_as_routes_claim_them() {
    let app = TestApp::new().await;
    let client = app.seed_client("Granja Sur", BillingType::Facturable).await;
    let route = app.create_route().await;

    let routed = app.create_order(client.id, &[(4, dec!(500))]).await;
    let waiting = app.create_order(client.id, &[(2, dec!(500))]).await;
    let unreviewed = app.create_order(client.id, &[(1, dec!(500))]).await;
    app.make_ready(routed.id).await;
    app.make_ready(waiting.id).await;

    app.services
        .route_planner
        .assign(route.id, vec![routed.id])
        .await
        .unwrap();

    let ready = app
        .services
        .route_planner
        .unassigned_ready_orders()
        .await
        .unwrap();
    let ready_ids: Vec<Uuid> = ready.iter().map(|o| o.id).collect();
    assert!(ready_ids.contains(&waiting.id));
    assert!(!ready_ids.contains(&routed.id));
    assert!(!ready_ids.contains(&unreviewed.id));
}
