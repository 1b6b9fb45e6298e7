/// Tree interchange codec.
///
/// One element per node: the element name is the node kind, attributes are
/// kept in document order, and the text payload is preserved exactly for
/// leaves. Whitespace between child elements is layout and is dropped.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::domain::ast::{Ast, Node, NodeId};
use crate::domain::kind::NodeKind;
use crate::error::{Error, Result};
use crate::ports::{TreeExporter, TreeImporter};

/// An element being read, with the children closed so far.
struct Open {
    node: Node,
    children: Vec<NodeId>,
    text: String,
}

fn start_node(e: &BytesStart<'_>) -> Result<Node> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut node = match NodeKind::from_tag(&name) {
        NodeKind::Unsupported => Node::unsupported(&name),
        kind => Node::new(kind),
    };
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?;
        node.set_attr(&key, value);
    }
    Ok(node)
}

/// Parses a tree document.
pub fn read_tree(document: &str) -> Result<Ast> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(false);

    // The placeholder root is overwritten when the document element closes.
    let mut ast = Ast::new(Node::new(NodeKind::ScriptBlock));
    let mut stack: Vec<Open> = Vec::new();
    let mut closed_root = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(e) => {
                if closed_root {
                    return Err(Error::Document("several root elements".into()));
                }
                stack.push(Open {
                    node: start_node(&e)?,
                    children: Vec::new(),
                    text: String::new(),
                });
            }
            Event::Empty(e) => {
                if closed_root {
                    return Err(Error::Document("several root elements".into()));
                }
                let node = start_node(&e)?;
                closed_root = close(&mut ast, &mut stack, node, Vec::new(), None);
            }
            Event::End(e) => {
                let Some(open) = stack.pop() else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(Error::Document(format!("unexpected closing tag </{}>", name)));
                };
                let text = if open.children.is_empty() || !open.text.trim().is_empty() {
                    Some(open.text)
                } else {
                    None
                };
                closed_root = close(&mut ast, &mut stack, open.node, open.children, text);
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                match stack.last_mut() {
                    // Only text ahead of the first child is payload.
                    Some(open) if open.children.is_empty() || !text.trim().is_empty() => {
                        open.text.push_str(&text)
                    }
                    Some(_) => {}
                    None if text.trim().is_empty() => {}
                    None => return Err(Error::Document("text outside the root element".into())),
                }
            }
            Event::CData(e) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::Document("unclosed elements at end of document".into()));
    }
    if !closed_root {
        return Err(Error::Document("empty document".into()));
    }
    Ok(ast)
}

/// Attaches a finished element to its parent, or installs it as the root.
/// Returns whether the root was closed.
fn close(
    ast: &mut Ast,
    stack: &mut [Open],
    mut node: Node,
    children: Vec<NodeId>,
    text: Option<String>,
) -> bool {
    node.text = text;
    match stack.last_mut() {
        Some(parent) => {
            let id = ast.add(node, children);
            parent.children.push(id);
            false
        }
        None => {
            let root = ast.root();
            *ast.node_mut(root) = node;
            ast.set_children(root, children);
            true
        }
    }
}

pub fn read_tree_file(path: &Path) -> Result<Ast> {
    let document = fs::read_to_string(path)?;
    let ast = read_tree(&document)?;
    debug!("Read {} nodes from {}", ast.len(), path.display());
    Ok(ast)
}

/// Serialises a tree as an indented document.
pub fn write_tree(ast: &Ast) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write_node(&mut writer, ast, ast.root())?;
    let mut document = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Document(e.to_string()))?;
    document.push('\n');
    Ok(document)
}

fn write_node(writer: &mut Writer<Vec<u8>>, ast: &Ast, id: NodeId) -> Result<()> {
    let node = ast.node(id);
    let name = node.element_name();
    let mut start = BytesStart::new(name);
    for (key, value) in node.attributes.iter() {
        start.push_attribute((key, value));
    }

    let children = node.children();
    match (&node.text, children.is_empty()) {
        (None, true) => {
            writer.write_event(Event::Empty(start))?;
        }
        (text, _) => {
            writer.write_event(Event::Start(start))?;
            if let Some(text) = text {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            for child in children {
                write_node(writer, ast, *child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

/// Reads and writes trees as interchange documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTreeCodec;

impl TreeImporter for XmlTreeCodec {
    fn import(&self, path: &Path) -> Result<Ast> {
        read_tree_file(path)
    }
}

impl TreeExporter for XmlTreeCodec {
    fn render(&self, ast: &Ast) -> Result<String> {
        write_tree(ast)
    }
}
