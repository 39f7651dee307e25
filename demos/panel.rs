#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release
#![allow(rustdoc::missing_crate_level_docs)] // it's a demo

use eframe::egui;
use egui_location_map::{
    config::ServiceConfig,
    location::{GraphNode, GraphState},
    panel::MapPanel,
};
use serde_json::json;

fn main() -> eframe::Result {
    env_logger::init(); // RUST_LOG=debug to see requests and map rebuilds

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Location map panel",
        options,
        Box::new(|_cc| Ok(Box::<MyApp>::default())),
    )
}

fn node(id: &str, node_type: &str, label: &str, properties: serde_json::Value) -> GraphNode {
    GraphNode {
        node_id: id.to_string(),
        node_type: node_type.to_string(),
        node_label: Some(label.to_string()),
        node_properties: properties.as_object().cloned().unwrap_or_default(),
    }
}

struct MyApp {
    panel: MapPanel,
    state: GraphState,
}

impl Default for MyApp {
    fn default() -> Self {
        let nodes = vec![
            node(
                "eiffel",
                "location",
                "Eiffel Tower",
                json!({ "latitude": 48.858370, "longitude": 2.294481 }),
            ),
            node(
                "louvre",
                "place",
                "Louvre",
                // No coordinates: geocoded from the address.
                json!({ "address": "Rue de Rivoli", "city": "Paris", "country": "France" }),
            ),
            node(
                "opera",
                "building",
                "Palais Garnier",
                json!({
                    "latitude": 48.871970,
                    "longitude": 2.331601,
                    "geometry": "POLYGON((2.3307 48.8715, 2.3325 48.8715, 2.3325 48.8726, 2.3307 48.8726, 2.3307 48.8715))",
                }),
            ),
            node(
                "witness",
                "person",
                "Witness",
                json!({ "name": "Jane Doe" }),
            ),
        ];

        let config = ServiceConfig {
            api_base_url: std::env::var("LOCATION_MAP_API")
                .unwrap_or_else(|_| ServiceConfig::default().api_base_url),
            ..Default::default()
        };

        Self {
            panel: MapPanel::new(config),
            state: GraphState {
                sketch_id: Some("demo-sketch".to_string()),
                nodes,
                selected_ids: Vec::new(),
            },
        }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("selection")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| {
                egui::widgets::global_theme_preference_buttons(ui);
                ui.separator();

                ui.label("Select two nodes to request a route");
                for node in &self.state.nodes {
                    let mut selected = self.state.selected_ids.contains(&node.node_id);
                    let label = node.node_label.clone().unwrap_or_default();
                    if ui.checkbox(&mut selected, label).changed() {
                        if selected {
                            self.state.selected_ids.push(node.node_id.clone());
                        } else {
                            self.state.selected_ids.retain(|id| id != &node.node_id);
                        }
                    }
                }
                if ui.button("Clear selection").clicked() {
                    self.state.selected_ids.clear();
                }

                ui.separator();
                let options = &mut self.panel.renderer().options;
                ui.checkbox(&mut options.center_on_first, "Center on first location");
                ui.add(egui::Slider::new(&mut options.zoom, 2..=18).text("Zoom"));
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.panel.show(ui, &self.state);
            });
    }
}
