use crate::error::TrieError;
use crate::kv::HashDB;
use crate::trie::{Node, Trie};

impl<D: HashDB> Trie<D> {
    /// Renders the tree, resolving every child through the node store.
    pub fn dump(&self) -> Result<String, TrieError> {
        let mut out = String::new();
        match self.root_node()? {
            Node::Empty => out.push_str("Trie is empty\n"),
            root => self.dump_recursive(&mut out, &root, "", true)?,
        }
        Ok(out)
    }

    fn dump_recursive(
        &self,
        out: &mut String,
        node: &Node,
        prefix: &str,
        is_last: bool,
    ) -> Result<(), TrieError> {
        let connector = if is_last { "└── " } else { "├── " };
        let new_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });

        match node {
            Node::Empty => out.push_str(&format!("{}{}Empty\n", prefix, connector)),
            Node::Leaf(leaf) => {
                out.push_str(&format!(
                    "{}{}Leaf({}) = 0x{}\n",
                    prefix,
                    connector,
                    leaf.path,
                    hex::encode(&leaf.value)
                ));
            }
            Node::Extension(ext) => {
                out.push_str(&format!("{}{}Ext({})\n", prefix, connector, ext.path()));
                let child = self.resolve(ext.child())?;
                self.dump_recursive(out, &child, &new_prefix, true)?;
            }
            Node::Branch(branch) => {
                match branch.value() {
                    Some(v) => out.push_str(&format!(
                        "{}{}Branch = 0x{}\n",
                        prefix,
                        connector,
                        hex::encode(v)
                    )),
                    None => out.push_str(&format!("{}{}Branch\n", prefix, connector)),
                }

                let active_children: Vec<_> = branch
                    .children()
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| c.as_ref().map(|child| (i, child)))
                    .collect();

                for (idx, (nibble, child)) in active_children.iter().enumerate() {
                    let is_last_child = idx == active_children.len() - 1;
                    out.push_str(&format!(
                        "{}{}[{:x}]\n",
                        new_prefix,
                        if is_last_child { "└── " } else { "├── " },
                        nibble
                    ));
                    let child_prefix = format!(
                        "{}{}",
                        new_prefix,
                        if is_last_child { "    " } else { "│   " }
                    );
                    let child = self.resolve(child)?;
                    self.dump_recursive(out, &child, &child_prefix, true)?;
                }
            }
        }
        Ok(())
    }
}
