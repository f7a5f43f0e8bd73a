use std::rc::Rc;

use script_proxy::{
    capability, init_logging, BridgeConfig, BridgeResult, QuickJsEngine, ScriptEngine, Session,
};

/// A tiny DOM so the demo has something to walk without a browser.
const FAKE_DOM: &str = r#"
function Element(name) {
  this.nodeName = name.toUpperCase();
  this.childNodes = [];
  this.attributes = {};
}
Element.prototype.appendChild = function (child) {
  this.childNodes.push(child);
  return child;
};
Element.prototype.setAttribute = function (name, value) {
  this.attributes[name] = String(value);
};
Element.prototype.getAttribute = function (name) {
  return Object.prototype.hasOwnProperty.call(this.attributes, name) ? this.attributes[name] : null;
};
var document = {
  title: 'Script proxy demo',
  documentElement: new Element('html'),
  createElement: function (tag) { return new Element(tag); }
};
document.documentElement.appendChild(new Element('body'));
var window = globalThis;
var foo = {
  bar: function (arg) { return document.createElement(arg); }
};
"#;

capability! {
    pub struct Window: "Window" {
        "getDocument" => fn document(&self) -> Option<Document>;
    }
}

capability! {
    pub struct Document: "Document" {
        "getTitle" => fn title(&self) -> Option<String>;
        "getDocumentElement" => fn document_element(&self) -> Option<Element>;
        "createElement" => fn create_element(&self, tag: &str) -> Option<Element>;
    }
}

capability! {
    pub struct Element: "Element" {
        "getNodeName" => fn node_name(&self) -> Option<String>;
        "getChildNodes" => fn child_nodes(&self) -> Vec<Element>;
        "appendChild" => fn append_child(&self, child: &Element) -> Option<Element>;
        "setAttribute" => fn set_attribute(&self, name: &str, value: &str) -> ();
        "getAttribute" => fn attribute(&self, name: &str) -> Option<String>;
    }
}

capability! {
    pub struct Foo: "Foo" {
        "bar" => fn bar(&self, tag: &str) -> Option<Element>;
    }
}

fn main() {
    let mut config = BridgeConfig::load_or_default();
    config.apply_env_overrides();
    init_logging(&config.logging);

    if let Err(e) = run(config) {
        eprintln!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config: BridgeConfig) -> BridgeResult<()> {
    let engine = Rc::new(QuickJsEngine::with_limits(&config.engine)?);
    engine.execute(FAKE_DOM)?;

    let session = Session::new(engine, config)?;
    session.install()?;

    if let Some(foo) = session.bind::<Foo>("foo")? {
        if let Some(div) = foo.bar("div")? {
            println!("foo.bar('div') = {:?} <{}>", div, div.node_name()?.unwrap_or_default());
        }
    }

    let window: Window = session.root();
    let Some(document) = window.document()? else {
        println!("window.document is not defined");
        return Ok(());
    };
    println!("title = {:?}", document.title()?);

    if let Some(root) = document.document_element()? {
        println!("documentElement.nodeName = {:?}", root.node_name()?);

        if let Some(section) = document.create_element("section")? {
            section.set_attribute("id", "main")?;
            root.append_child(&section)?;
        }
        for child in root.child_nodes()? {
            println!(
                "  <{}> id={:?}",
                child.node_name()?.unwrap_or_default(),
                child.attribute("id")?
            );
        }
    }

    println!("handle table holds {} objects", session.table_len()?);
    Ok(())
}
