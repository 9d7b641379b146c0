use annpale_db_macros::TextEnum;

#[derive(Debug, Clone, PartialEq, Eq, Default, TextEnum)]
enum DeliveryState {
    #[default]
    Pending,
    InTransit,
    Delivered,
}

#[test]
fn as_str_is_snake_case() {
    assert_eq!(DeliveryState::Pending.as_str(), "pending");
    assert_eq!(DeliveryState::InTransit.as_str(), "in_transit");
    assert_eq!(DeliveryState::Delivered.as_str(), "delivered");
}

#[test]
fn display_matches_as_str() {
    assert_eq!(DeliveryState::InTransit.to_string(), "in_transit");
}

#[test]
fn parses_back_from_text() {
    assert_eq!("pending".parse::<DeliveryState>().unwrap(), DeliveryState::Pending);
    assert_eq!("in_transit".parse::<DeliveryState>().unwrap(), DeliveryState::InTransit);
    assert!("nope".parse::<DeliveryState>().is_err());
}

#[test]
fn serde_round_trip_as_string() {
    let json = serde_json::to_string(&DeliveryState::Delivered).unwrap();
    assert_eq!(json, "\"delivered\"");
    let back: DeliveryState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, DeliveryState::Delivered);
}
