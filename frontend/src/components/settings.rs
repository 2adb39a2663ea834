use leptos::prelude::*;

use hyper_chat_frontend::models::{AVAILABLE_MODELS, MAX_TEMPERATURE};

use crate::state::AppState;

/// Model picker and temperature slider. Every change is saved immediately.
#[component]
pub fn SettingsPanel() -> impl IntoView {
    let state = expect_context::<AppState>();
    let store = state.store;
    let settings = move || store.with(|s| s.settings().clone());

    view! {
        <div class="settings-panel">
            <label class="settings-field">
                "Model "
                <select on:change=move |ev| {
                    let mut next = settings();
                    next.model = event_target_value(&ev);
                    state.update_settings(next);
                }>
                    {AVAILABLE_MODELS
                        .iter()
                        .map(|&(id, name)| {
                            view! {
                                <option value=id selected=move || settings().model == id>
                                    {name}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </label>
            <label class="settings-field">
                {move || format!("Temperature: {:.1} ", settings().temperature)}
                <input
                    type="range"
                    class="temperature-slider"
                    min="0"
                    max=MAX_TEMPERATURE.to_string()
                    step="0.1"
                    prop:value=move || settings().temperature.to_string()
                    on:input=move |ev| {
                        if let Ok(temperature) = event_target_value(&ev).parse::<f64>() {
                            let mut next = settings();
                            next.temperature = temperature;
                            state.update_settings(next);
                        }
                    }
                />
            </label>
        </div>
    }
}
