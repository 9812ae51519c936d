//! JavaScript snippets evaluated in the page. All element addressing goes
//! through the `data-cartflow-ref` marker attribute stamped during
//! harvest, so handles survive DOM reshuffles that keep the node alive
//! and fail loudly when the node is gone.

/// Escape a Rust string as a JavaScript string literal.
pub fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub fn by_ref(handle: &str) -> String {
    format!(
        "document.querySelector('[data-cartflow-ref=' + JSON.stringify({}) + ']')",
        js_str(handle)
    )
}

pub const HARVEST_BUTTONS: &str = r#"
(() => {
  const out = [];
  let seq = window.__cartflowSeq || 0;
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0';
  };
  const inOverlay = (el) => {
    for (let n = el; n && n !== document.body; n = n.parentElement) {
      const s = window.getComputedStyle(n);
      const z = parseInt(s.zIndex, 10) || 0;
      if ((s.position === 'fixed' || s.position === 'absolute') && z > 1000) return true;
      if (n.getAttribute && n.getAttribute('aria-modal') === 'true') return true;
      const cls = (n.className && n.className.toString) ? n.className.toString().toLowerCase() : '';
      if (/(modal|drawer|popup|overlay|dialog)/.test(cls)) return true;
    }
    return false;
  };
  const nodes = document.querySelectorAll(
    "button, a[href], input[type='submit'], input[type='button'], [role='button'], [onclick]");
  const seen = new Set();
  for (const el of nodes) {
    if (seen.has(el)) continue;
    seen.add(el);
    let ref = el.getAttribute('data-cartflow-ref');
    if (!ref) { ref = 'b' + (++seq); el.setAttribute('data-cartflow-ref', ref); }
    out.push({
      handle: ref,
      tag: el.tagName.toLowerCase(),
      text: ((el.innerText || el.value || '') + '').trim().slice(0, 200),
      aria_label: el.getAttribute('aria-label') || '',
      id: el.id || '',
      classes: (el.className && el.className.toString) ? el.className.toString() : '',
      data_testid: el.getAttribute('data-testid') || el.getAttribute('data-test') || '',
      href: el.getAttribute('href') || '',
      disabled: !!(el.disabled || el.getAttribute('aria-disabled') === 'true'),
      visible: visible(el),
      in_overlay: inOverlay(el),
    });
  }
  window.__cartflowSeq = seq;
  return out;
})()
"#;

pub const HARVEST_FIELDS: &str = r#"
(() => {
  const out = [];
  let seq = window.__cartflowSeq || 0;
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none';
  };
  const labelFor = (el) => {
    if (el.labels && el.labels.length) return el.labels[0].innerText.trim();
    const wrap = el.closest('label');
    if (wrap) return wrap.innerText.trim();
    const id = el.id;
    if (id) {
      const lab = document.querySelector('label[for=' + JSON.stringify(id) + ']');
      if (lab) return lab.innerText.trim();
    }
    return '';
  };
  const skip = new Set(['hidden', 'submit', 'button', 'image', 'reset', 'checkbox', 'radio', 'file']);
  const nodes = document.querySelectorAll('input, select, textarea');
  for (const el of nodes) {
    const type = (el.getAttribute('type') || 'text').toLowerCase();
    if (el.tagName === 'INPUT' && skip.has(type)) continue;
    let ref = el.getAttribute('data-cartflow-ref');
    if (!ref) { ref = 'f' + (++seq); el.setAttribute('data-cartflow-ref', ref); }
    out.push({
      handle: ref,
      tag: el.tagName.toLowerCase(),
      input_type: el.tagName === 'INPUT' ? type : '',
      id: el.id || '',
      name: el.getAttribute('name') || '',
      autocomplete: (el.getAttribute('autocomplete') || '').toLowerCase(),
      placeholder: el.getAttribute('placeholder') || '',
      label: labelFor(el).slice(0, 120),
      aria_label: el.getAttribute('aria-label') || '',
      data_testid: el.getAttribute('data-testid') || el.getAttribute('data-test') || '',
      current_value: (el.value || '') + '',
      visible: visible(el),
    });
  }
  window.__cartflowSeq = seq;
  return out;
})()
"#;

pub const BODY_TEXT: &str =
    "(() => document.body ? document.body.innerText.slice(0, 5000) : '')()";

pub fn click(handle: &str) -> String {
    format!(
        r#"(() => {{
  const el = {sel};
  if (!el) return false;
  el.scrollIntoView({{block: 'center', inline: 'nearest'}});
  el.click();
  return true;
}})()"#,
        sel = by_ref(handle)
    )
}

pub fn set_value(handle: &str, value: &str, wide_events: bool) -> String {
    let extra = if wide_events {
        r#"el.dispatchEvent(new KeyboardEvent('keydown', {bubbles: true}));
  el.dispatchEvent(new KeyboardEvent('keyup', {bubbles: true}));"#
    } else {
        ""
    };
    format!(
        r#"(() => {{
  const el = {sel};
  if (!el) return false;
  const proto = el.tagName === 'TEXTAREA' ? window.HTMLTextAreaElement.prototype
                                          : window.HTMLInputElement.prototype;
  const desc = Object.getOwnPropertyDescriptor(proto, 'value');
  if (desc && desc.set) {{ desc.set.call(el, {val}); }} else {{ el.value = {val}; }}
  el.dispatchEvent(new Event('input', {{bubbles: true}}));
  el.dispatchEvent(new Event('change', {{bubbles: true}}));
  {extra}
  return true;
}})()"#,
        sel = by_ref(handle),
        val = js_str(value),
        extra = extra
    )
}

pub fn focus_and_clear(handle: &str) -> String {
    format!(
        r#"(() => {{
  const el = {sel};
  if (!el) return false;
  el.scrollIntoView({{block: 'center'}});
  el.focus();
  el.select && el.select();
  const desc = Object.getOwnPropertyDescriptor(window.HTMLInputElement.prototype, 'value');
  if (desc && desc.set) {{ desc.set.call(el, ''); }} else {{ el.value = ''; }}
  return true;
}})()"#,
        sel = by_ref(handle)
    )
}

pub fn dispatch_input_events(handle: &str) -> String {
    format!(
        r#"(() => {{
  const el = {sel};
  if (!el) return false;
  el.dispatchEvent(new Event('input', {{bubbles: true}}));
  el.dispatchEvent(new Event('change', {{bubbles: true}}));
  return true;
}})()"#,
        sel = by_ref(handle)
    )
}

pub fn read_value(handle: &str) -> String {
    format!(
        "(() => {{ const el = {sel}; return el ? ((el.value || '') + '') : null; }})()",
        sel = by_ref(handle)
    )
}

pub fn blur(handle: &str) -> String {
    format!(
        "(() => {{ const el = {sel}; if (!el) return false; el.blur(); return true; }})()",
        sel = by_ref(handle)
    )
}

pub fn is_attached(handle: &str) -> String {
    format!("(() => {{ const el = {sel}; return !!(el && el.isConnected); }})()", sel = by_ref(handle))
}

pub fn select_options(handle: &str) -> String {
    format!(
        r#"(() => {{
  const el = {sel};
  if (!el || el.tagName !== 'SELECT') return [];
  return Array.from(el.options).map(o => ({{value: o.value, text: (o.text || '').trim()}}));
}})()"#,
        sel = by_ref(handle)
    )
}

pub fn select_option(handle: &str, value: &str) -> String {
    format!(
        r#"(() => {{
  const el = {sel};
  if (!el || el.tagName !== 'SELECT') return false;
  el.value = {val};
  el.dispatchEvent(new Event('input', {{bubbles: true}}));
  el.dispatchEvent(new Event('change', {{bubbles: true}}));
  return el.value === {val};
}})()"#,
        sel = by_ref(handle),
        val = js_str(value)
    )
}

pub fn pick_visible_option(text: &str) -> String {
    format!(
        r#"(() => {{
  const norm = (s) => (s || '').toLowerCase().replace(/[-_\s]+/g, '');
  const wanted = norm({val});
  if (!wanted) return false;
  const nodes = document.querySelectorAll(
    "[role='option'], li, [class*='option'], [class*='dropdown'] a, [class*='dropdown'] div");
  for (const el of nodes) {{
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) continue;
    const t = norm(el.innerText);
    if (t && (t === wanted || t.includes(wanted))) {{ el.click(); return true; }}
  }}
  return false;
}})()"#,
        val = js_str(text)
    )
}

pub const CLICK_FIRST_SUGGESTION: &str = r#"
(() => {
  const selectors = [
    "[role='listbox'] [role='option']",
    ".pac-item",
    "ul[class*='autocomplete'] li",
    "ul[class*='suggestion'] li",
    "[class*='suggestion'][class*='item']",
  ];
  for (const sel of selectors) {
    const el = document.querySelector(sel);
    if (el) {
      const r = el.getBoundingClientRect();
      if (r.width > 0 && r.height > 0) { el.click(); return true; }
    }
  }
  return false;
})()
"#;

pub const SHIPPING_OPTIONS: &str = r#"
(() => {
  const out = [];
  let seq = window.__cartflowSeq || 0;
  const priceish = /((\$|€|£)\s?\d)|(\d+[.,]\d{2})|free/i;
  for (const el of document.querySelectorAll("input[type='radio']")) {
    const name = (el.getAttribute('name') || '').toLowerCase();
    const container = el.closest('label') || el.parentElement;
    const text = container ? container.innerText.trim() : '';
    const shippy = /ship|deliver|rate|method/.test(name) || priceish.test(text);
    if (!shippy) continue;
    let ref = el.getAttribute('data-cartflow-ref');
    if (!ref) { ref = 'r' + (++seq); el.setAttribute('data-cartflow-ref', ref); }
    out.push({
      handle: ref,
      label: text.split('\n')[0].slice(0, 120),
      price_text: text.slice(0, 200),
      checked: !!el.checked,
    });
  }
  window.__cartflowSeq = seq;
  return out;
})()
"#;

pub const HAS_BLOCKING_OVERLAY: &str = r#"
(() => {
  const vw = window.innerWidth, vh = window.innerHeight;
  for (const el of document.querySelectorAll('body *')) {
    const s = window.getComputedStyle(el);
    if (s.position !== 'fixed') continue;
    const z = parseInt(s.zIndex, 10) || 0;
    if (z < 1000) continue;
    if (s.visibility === 'hidden' || s.display === 'none' || s.opacity === '0') continue;
    const r = el.getBoundingClientRect();
    if (r.width * r.height > vw * vh * 0.3) return true;
  }
  return false;
})()
"#;

pub const REMOVE_OVERLAY_NODES: &str = r#"
(() => {
  const vw = window.innerWidth, vh = window.innerHeight;
  const doomed = [];
  for (const el of document.querySelectorAll('body *')) {
    const cls = (el.className && el.className.toString) ? el.className.toString().toLowerCase() : '';
    const byClass = /(overlay|backdrop|modal-backdrop|interstitial|newsletter-popup)/.test(cls);
    const s = window.getComputedStyle(el);
    const z = parseInt(s.zIndex, 10) || 0;
    const r = el.getBoundingClientRect();
    const covering = s.position === 'fixed' && z > 9000 && r.width * r.height > vw * vh * 0.3;
    if (byClass || covering) doomed.push(el);
  }
  for (const el of doomed) el.remove();
  return doomed.length;
})()
"#;

pub const CLEAR_SCROLL_LOCKS: &str = r#"
(() => {
  for (const el of [document.body, document.documentElement]) {
    if (!el) continue;
    el.style.overflow = '';
    el.style.position = '';
    for (const cls of ['no-scroll', 'noscroll', 'modal-open', 'overflow-hidden', 'scroll-lock']) {
      el.classList.remove(cls);
    }
  }
  return true;
})()
"#;

pub fn scroll_by(dy: i64) -> String {
    format!("(() => {{ window.scrollBy(0, {dy}); return true; }})()")
}

pub const CART_BADGE_COUNT: &str = r#"
(() => {
  const selectors = [
    '[data-cart-count]',
    '[class*="cart-count"]',
    '[class*="cart-badge"]',
    '[class*="cart__count"]',
    'a[href*="cart"] span',
  ];
  for (const sel of selectors) {
    for (const el of document.querySelectorAll(sel)) {
      const raw = el.getAttribute('data-cart-count') || el.innerText || '';
      const m = raw.match(/\d+/);
      if (m) return parseInt(m[0], 10);
    }
  }
  return null;
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_str_escapes_quotes() {
        assert_eq!(js_str(r#"O'Brien "jr""#), r#""O'Brien \"jr\"""#);
    }

    #[test]
    fn click_script_embeds_handle() {
        let script = click("b7");
        assert!(script.contains("data-cartflow-ref"));
        assert!(script.contains("\"b7\""));
    }

    #[test]
    fn set_value_wide_mode_adds_key_events() {
        assert!(set_value("f1", "x", true).contains("keydown"));
        assert!(!set_value("f1", "x", false).contains("keydown"));
    }
}
