#![cfg(target_arch = "wasm32")]

use crate::config::SimulationConfig;
use crate::engine::{scenario_catalog, Engine, Portrait, ScenarioInfo, Swing, SCENARIO_DAMPED};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn available_scenarios() -> js_sys::Array {
    let out = js_sys::Array::new();
    for info in scenario_catalog() {
        out.push(&scenario_info_to_js(info));
    }
    out
}

#[wasm_bindgen]
pub fn config_defaults() -> JsValue {
    serde_wasm_bindgen::to_value(&SimulationConfig::default()).unwrap_or(JsValue::NULL)
}

fn scenario_info_to_js(info: &ScenarioInfo) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("id"), &JsValue::from_str(info.id));
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("name"), &JsValue::from_str(info.name));
    let _ = js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("description"),
        &JsValue::from_str(info.description),
    );
    JsValue::from(obj)
}

fn to_js_err(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Numeric arrays for a JS renderer. Integration runs lazily and is cached.
#[wasm_bindgen]
pub struct WasmPendulum {
    engine: Engine,
    swing: Option<Swing>,
    portrait: Option<Portrait>,
}

impl WasmPendulum {
    fn from_engine(engine: Engine) -> Self {
        Self { engine, swing: None, portrait: None }
    }

    fn swing(&mut self) -> Result<&Swing, JsValue> {
        if self.swing.is_none() {
            self.swing = Some(self.engine.swing().map_err(to_js_err)?);
        }
        self.swing.as_ref().ok_or_else(|| JsValue::from_str("swing unavailable"))
    }

    fn portrait(&mut self) -> Result<&Portrait, JsValue> {
        if self.portrait.is_none() {
            self.portrait = Some(self.engine.portrait().map_err(to_js_err)?);
        }
        self.portrait.as_ref().ok_or_else(|| JsValue::from_str("portrait unavailable"))
    }
}

#[wasm_bindgen]
impl WasmPendulum {
    #[wasm_bindgen(constructor)]
    pub fn new(scenario_id: Option<String>) -> Result<WasmPendulum, JsValue> {
        let id = scenario_id.as_deref().unwrap_or(SCENARIO_DAMPED);
        let engine = Engine::new_builtin(id).map_err(to_js_err)?;
        Ok(Self::from_engine(engine))
    }

    /// Build from a partial config object, see `SimulationConfig` for the keys.
    #[wasm_bindgen(js_name = "newFromConfig")]
    pub fn new_from_config(config: JsValue) -> Result<WasmPendulum, JsValue> {
        let cfg: SimulationConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("invalid config: {}", e)))?;
        let engine = Engine::new(cfg).map_err(to_js_err)?;
        Ok(Self::from_engine(engine))
    }

    pub fn length(&self) -> f64 { self.engine.constants().length() }

    pub fn bob_radius(&self) -> f64 { self.engine.constants().bob_radius() }

    pub fn theta_limit(&mut self) -> Result<f64, JsValue> {
        Ok(self.portrait()?.grid.theta_limit())
    }

    pub fn omega_limit(&mut self) -> Result<f64, JsValue> {
        Ok(self.portrait()?.grid.omega_limit())
    }

    pub fn times(&mut self) -> Result<Vec<f32>, JsValue> {
        Ok(self.swing()?.times_flat())
    }

    /// [x, y, vx, vy] per frame.
    pub fn samples(&mut self) -> Result<Vec<f32>, JsValue> {
        Ok(self.swing()?.samples_flat())
    }

    /// [θ, ω] per frame.
    pub fn phase_path(&mut self) -> Result<Vec<f32>, JsValue> {
        Ok(self.swing()?.phase_path_flat())
    }

    /// [θ, ω, dθ, dω] per arrow.
    pub fn field_arrows(&mut self) -> Result<Vec<f32>, JsValue> {
        Ok(self.portrait()?.arrows_flat())
    }

    pub fn failed_trajectories(&mut self) -> Result<usize, JsValue> {
        Ok(self.portrait()?.failed_count())
    }
}
