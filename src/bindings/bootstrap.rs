//! Bootstrap script for the script-side handle table
//!
//! Installs two globals into the engine:
//!
//! - the handle table (`nsiArray` by default), an array whose index is the
//!   handle and whose slot `0` is the root object;
//! - the wire converter (`convertNsi` by default), which maps any script value
//!   to wire form, registering opaque objects in the table on the way.
//!
//! Registration is idempotent: a registered object is tagged with a
//! non-enumerable own property holding its handle. Objects that refuse the tag
//! (frozen, sealed, a proxy rejecting `defineProperty`, or a foreign
//! non-configurable property of the same name) are kept in an identity map.

use crate::bindings::protocol::HANDLE_TOKEN_PREFIX;
use crate::config::BridgeConfig;

const CONVERTER_TEMPLATE: &str = r#"(function (global) {
  var table = [__ROOT__];
  var hasOwn = Object.prototype.hasOwnProperty;

  // objects that refuse the tag, keyed by identity
  var untagged = new Map();

  function tag(value, handle) {
    try {
      Object.defineProperty(value, '__TAG__', {
        value: handle,
        enumerable: false,
        configurable: true,
        writable: true
      });
    } catch (e) {
      return false;
    }
    return hasOwn.call(value, '__TAG__') && value['__TAG__'] === handle;
  }

  function register(value) {
    if (hasOwn.call(value, '__TAG__')) {
      var tagged = value['__TAG__'];
      if (table[tagged] === value) {
        return tagged;
      }
    }
    var known = untagged.get(value);
    if (known !== undefined && table[known] === value) {
      return known;
    }
    var handle = table.length;
    table[handle] = value;
    if (!tag(value, handle)) {
      untagged.set(value, handle);
    }
    return handle;
  }

  function convert(param) {
    if (param === null || param === undefined) {
      return null;
    }
    if (Array.isArray(param)) {
      var converted = new Array(param.length);
      for (var i = 0; i < param.length; i++) {
        converted[i] = convert(param[i]);
      }
      return converted;
    }
    var type = typeof param;
    if (type === 'object' || type === 'function') {
      return '__PREFIX__' + register(param);
    }
    return param;
  }

  if (table[0] !== null && table[0] !== undefined && !tag(table[0], 0)) {
    untagged.set(table[0], 0);
  }
  global['__TABLE__'] = table;
  global['__CONVERTER__'] = convert;
})(globalThis);"#;

fn render(config: &BridgeConfig) -> String {
    CONVERTER_TEMPLATE
        .replace("__ROOT__", &format!("({})", config.root_expression))
        .replace("__TAG__", &config.tag_property)
        .replace("__PREFIX__", HANDLE_TOKEN_PREFIX)
        .replace("__TABLE__", &config.table_name)
        .replace("__CONVERTER__", &config.converter_name)
}

/// Script that (re)installs the table unconditionally, resetting it so that
/// handle `0` binds to whatever the root expression currently names.
pub fn install_script(config: &BridgeConfig) -> String {
    render(config)
}

/// Script that installs the table only when it is not present yet.
pub fn guarded_install_script(config: &BridgeConfig) -> String {
    format!(
        "if (!Array.isArray(globalThis['{}'])) {{\n{}\n}}",
        config.table_name,
        render(config)
    )
}

/// Function body answering whether the table is present in the global scope.
pub fn presence_probe(config: &BridgeConfig) -> String {
    format!(
        "return Array.isArray(globalThis['{}']) && typeof globalThis['{}'] === 'function';",
        config.table_name, config.converter_name
    )
}

/// Function body returning the current table size.
pub fn size_probe(config: &BridgeConfig) -> String {
    format!("return {}.length;", config.table_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_script_uses_configured_names() {
        let config = BridgeConfig {
            table_name: "handles".to_string(),
            converter_name: "toWire".to_string(),
            tag_property: "__handle".to_string(),
            root_expression: "document".to_string(),
            ..BridgeConfig::default()
        };
        let script = install_script(&config);
        assert!(script.contains("global['handles'] = table;"));
        assert!(script.contains("global['toWire'] = convert;"));
        assert!(script.contains("hasOwn.call(value, '__handle')"));
        assert!(script.contains("var table = [(document)];"));
        assert!(script.contains("'nsiId=' + register(param)"));
        assert!(!script.contains("__TABLE__"));
        assert!(!script.contains("__PREFIX__"));
    }

    #[test]
    fn test_guarded_script_checks_table() {
        let script = guarded_install_script(&BridgeConfig::default());
        assert!(script.starts_with("if (!Array.isArray(globalThis['nsiArray'])) {"));
        assert!(script.ends_with("}"));
    }

    #[test]
    fn test_default_root_is_global_object() {
        let script = install_script(&BridgeConfig::default());
        assert!(script.contains("var table = [(globalThis)];"));
    }
}
