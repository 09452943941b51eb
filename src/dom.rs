use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, ScrollBehavior,
    ScrollToOptions,
};

/// Get element by ID
pub fn get_element_by_id(document: &Document, id: &str) -> Result<Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Element not found: {}", id)))
}

/// Get HTML element by ID
pub fn get_html_element_by_id(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    let element = get_element_by_id(document, id)?;
    element
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("Element is not HtmlElement: {}", id)))
}

/// Get input element by ID
pub fn get_input_by_id(document: &Document, id: &str) -> Result<HtmlInputElement, JsValue> {
    let element = get_element_by_id(document, id)?;
    element
        .dyn_into::<HtmlInputElement>()
        .map_err(|_| JsValue::from_str(&format!("Element is not HtmlInputElement: {}", id)))
}

/// Get button element by ID
pub fn get_button_by_id(document: &Document, id: &str) -> Result<HtmlButtonElement, JsValue> {
    let element = get_element_by_id(document, id)?;
    element
        .dyn_into::<HtmlButtonElement>()
        .map_err(|_| JsValue::from_str(&format!("Element is not HtmlButtonElement: {}", id)))
}

/// Add a click listener to an element
pub fn add_click_listener<F>(element: &Element, callback: F) -> Result<(), JsValue>
where
    F: FnMut() + 'static,
{
    let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
    element.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget(); // Keep the closure alive
    Ok(())
}

/// Add a keydown listener to an element
pub fn add_keydown_listener<F>(element: &Element, callback: F) -> Result<(), JsValue>
where
    F: FnMut(web_sys::KeyboardEvent) + 'static,
{
    let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut(_)>);
    element.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Show element, letting the stylesheet pick the display mode
pub fn show_element(element: &HtmlElement) {
    let _ = element.style().remove_property("display");
}

/// Hide element
pub fn hide_element(element: &HtmlElement) {
    let _ = element.style().set_property("display", "none");
}

/// Scroll element to its newest content with an animated scroll
pub fn scroll_to_latest(element: &Element) {
    let options = ScrollToOptions::new();
    options.set_top(element.scroll_height() as f64);
    options.set_behavior(ScrollBehavior::Smooth);
    element.scroll_to_with_scroll_to_options(&options);
}
