use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::*;

struct ConfigLayer {
    values: BTreeMap<String, Value>,
    // this push changed since last cycle, so widgets created under it are rebuilt instead of patched
    refresh: bool,
}

/// The style configuration cascade.
///
/// Widgets read it in their `generate` and `update` functions. Lookups go from the innermost [`Ui::push_config`] layer out to the process-wide root table.
pub struct Config {
    root: BTreeMap<String, Value>,
    layers: Vec<ConfigLayer>,
    // what each push_config call site pushed the last time it ran
    last_pushed: AHashMap<WidgetId, BTreeMap<String, Value>>,
}

impl Config {
    pub fn new(root: BTreeMap<String, Value>) -> Config {
        return Config {
            root,
            layers: Vec::with_capacity(8),
            last_pushed: AHashMap::new(),
        };
    }

    /// The root configuration used by the built-in widgets.
    pub fn defaults() -> Config {
        let root = [
            ("TextColor", Value::from("#FFFFFF")),
            ("TextSize", Value::from(13)),
            ("TextFont", Value::from("Code")),
            ("ItemSpacing", Value::from(4)),
            ("FramePadding", Value::from(4)),
            ("WindowBgColor", Value::from("#0F0F0F")),
            ("ButtonColor", Value::from("#294A7A")),
            ("CheckMarkText", Value::from("✓")),
        ];
        let root = root.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        return Config::new(root);
    }

    /// Look up `key`, innermost layer first. Missing keys read as `Nil`.
    pub fn get(&self, key: &str) -> &Value {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.values.get(key) {
                return value;
            }
        }
        return self.root.get(key).unwrap_or(&NIL);
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        return self.get(key).as_number();
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        return self.get(key).as_str();
    }

    pub fn depth(&self) -> usize {
        return self.layers.len();
    }

    pub(crate) fn local_refresh_active(&self) -> bool {
        return self.layers.iter().any(|l| l.refresh);
    }

    /// Push a layer for the call site `site`. Returns whether the pushed values differ from the ones this call site pushed last time.
    pub(crate) fn push(&mut self, site: WidgetId, values: BTreeMap<String, Value>) -> bool {
        let refresh = match self.last_pushed.get(&site) {
            // the first push from a call site has nothing to invalidate
            None => false,
            Some(last) => *last != values,
        };
        if refresh || !self.last_pushed.contains_key(&site) {
            self.last_pushed.insert(site, values.clone());
        }

        self.layers.push(ConfigLayer { values, refresh });
        return refresh;
    }

    pub(crate) fn pop(&mut self) -> Result<(), UiError> {
        return match self.layers.pop() {
            Some(_) => Ok(()),
            None => Err(UiError::TooManyConfigPops),
        };
    }

    pub(crate) fn reset_layers(&mut self) {
        self.layers.clear();
    }

    pub(crate) fn update_root(&mut self, values: BTreeMap<String, Value>) {
        self.root.extend(values);
    }
}

static NIL: Value = Value::Nil;

/// Converts a config table given as a [`Value`]. Anything that isn't a table is an empty layer.
pub(crate) fn table_from_value(value: Value) -> BTreeMap<String, Value> {
    return match value {
        Value::Table(table) => table,
        Value::Nil => BTreeMap::new(),
        other => {
            log::warn!("push_config() expects a table, got {other}. Ignoring it");
            BTreeMap::new()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, i32)]) -> BTreeMap<String, Value> {
        return table_from_value(Value::table(pairs.iter().map(|(k, v)| (*k, *v))));
    }

    #[test]
    fn lookups_fall_back_to_outer_layers() {
        let mut config = Config::defaults();
        config.push(WidgetId::new("a"), table(&[("TextSize", 20), ("ItemSpacing", 8)]));
        config.push(WidgetId::new("b"), table(&[("TextSize", 30)]));

        assert_eq!(config.number("TextSize"), Some(30.0));
        assert_eq!(config.number("ItemSpacing"), Some(8.0));
        assert_eq!(config.number("FramePadding"), Some(4.0));
        assert!(config.get("Nonexistent").is_nil());

        config.pop().unwrap();
        assert_eq!(config.number("TextSize"), Some(20.0));
        config.pop().unwrap();
        assert_eq!(config.number("TextSize"), Some(13.0));
        assert!(matches!(config.pop(), Err(UiError::TooManyConfigPops)));
    }

    #[test]
    fn changed_pushes_request_a_local_refresh() {
        let mut config = Config::defaults();
        let site = WidgetId::new("site");

        assert!(config.push(site.clone(), table(&[("TextSize", 20)])) == false);
        config.pop().unwrap();

        assert!(config.push(site.clone(), table(&[("TextSize", 20)])) == false);
        assert!(config.local_refresh_active() == false);
        config.pop().unwrap();

        assert!(config.push(site.clone(), table(&[("TextSize", 25)])));
        assert!(config.local_refresh_active());
        config.push(WidgetId::new("inner"), table(&[]));
        assert!(config.local_refresh_active());
        config.pop().unwrap();
        config.pop().unwrap();
        assert!(config.local_refresh_active() == false);
    }
}
