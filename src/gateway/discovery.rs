//! Device announcement published on every broker connect.
//!
//! The document is retained so a dashboard that comes up later still learns
//! about the appliance: its identity plus the components it exposes
//! (diagnostic sensors, the brightness number, and the remote buttons).

use serde_json::{json, Map, Value};

use super::Topics;
use crate::config::DeviceIdentity;

/// Build the retained announcement document.
pub fn document(identity: &DeviceIdentity, topics: &Topics) -> Value {
    let mac_compact = identity.mac.replace(':', "").to_lowercase();

    let mut components = Map::new();
    for (suffix, component) in component_catalog() {
        let key = format!("{}-{}", identity.unique_id, suffix);
        let mut component = component;
        component.insert("unique_id".into(), json!(key));
        components.insert(key, Value::Object(component));
    }

    json!({
        "dev": {
            "identifiers": [identity.unique_id, mac_compact],
            "connections": [["mac", identity.mac]],
            "name": format!("{} kiosk", identity.unique_id),
            "model": "kiosk-agent",
        },
        "origin": {
            "name": "kiosk-agent",
            "sw_version": env!("CARGO_PKG_VERSION"),
        },
        "components": components,
        "state_topic": topics.state(),
        "command_topic": topics.command(),
        "availability_topic": topics.availability(),
    })
}

fn component_catalog() -> Vec<(&'static str, Map<String, Value>)> {
    let object = |value: Value| -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    };

    vec![
        (
            "cputemp",
            object(json!({
                "name": "CPU Temperature",
                "unit_of_measurement": "°C",
                "device_class": "temperature",
                "platform": "sensor",
                "entity_category": "diagnostic",
                "value_template": "{{ value_json.cputemp }}",
            })),
        ),
        (
            "uptime",
            object(json!({
                "name": "Uptime",
                "unit_of_measurement": "s",
                "device_class": "duration",
                "platform": "sensor",
                "entity_category": "diagnostic",
                "value_template": "{{ value_json.uptime }}",
            })),
        ),
        (
            "reboot",
            object(json!({
                "name": "Reboot",
                "device_class": "restart",
                "entity_category": "diagnostic",
                "platform": "button",
                "payload_press": "{\"command\": \"reboot\"}",
            })),
        ),
        (
            "reload",
            object(json!({
                "name": "Reload page",
                "device_class": "restart",
                "entity_category": "diagnostic",
                "platform": "button",
                "payload_press": "{\"command\": \"reload\"}",
            })),
        ),
        (
            "brightness",
            object(json!({
                "name": "Screen brightness",
                "icon": "mdi:brightness-7",
                "command_template": "{\"command\": \"set_brightness\", \"arg\": {{ value }} }",
                "value_template": "{{ value_json.brightness }}",
                "min": 0,
                "max": 100,
                "unit_of_measurement": "%",
                "platform": "number",
            })),
        ),
    ]
}
