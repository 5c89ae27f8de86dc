//! # Árvore de Documento em Arena
//!
//! Representação mutável de um documento XML no estilo "text/tail":
//! cada elemento guarda o texto que vem **antes** do primeiro filho (`text`)
//! e, como filho, o texto que vem **depois** dele no fluxo do pai (`tail`).
//!
//! ```text
//! <ab>dis<lb n="2"/>manibus</ab>
//!
//! ab.text = "dis"      lb.tail = "manibus"
//! ```
//!
//! A invariante fundamental é que `text + (filho, tail)*` reconstrói
//! exatamente o fluxo original de caracteres.
//!
//! ## Por que uma arena?
//!
//! Os nós vivem num `Vec<NodeData>` e se referenciam por índice ([`NodeId`]).
//! Pai, filhos e irmãos são índices, não ponteiros compartilhados: não há
//! ciclos de posse e a consulta ao pai é O(1), o que o tokenizador usa o tempo
//! todo para verificar fronteiras. Nós desanexados continuam na arena até o
//! documento ser descartado.

use serde::Serialize;

/// Índice de um nó dentro de um [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

/// Tipo de nó armazenado na arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Elemento com nome, atributos e filhos.
    Element,
    /// Comentário `<!-- ... -->`; o conteúdo fica em `text`.
    Comment,
    /// Instrução de processamento `<?alvo dados?>`; o alvo fica em `name`, os dados em `text`.
    ProcessingInstruction,
}

/// Dados de um nó. Os vínculos estruturais (pai e filhos) só são alterados
/// pelos métodos de [`Document`], para manter a árvore consistente.
#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    /// Nome qualificado como escrito no documento (ex: `w`, `tei:w`).
    name: String,
    /// Atributos na ordem original.
    attrs: Vec<(String, String)>,
    text: Option<String>,
    tail: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind, name: String) -> Self {
        Self {
            kind,
            name,
            attrs: Vec::new(),
            text: None,
            tail: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Um documento XML completo: a arena de nós, o elemento raiz e o texto
/// bruto que cerca a raiz (declaração XML, DOCTYPE, instruções de processamento).
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    /// Tudo que precede o elemento raiz, preservado literalmente.
    pub prolog: String,
    /// Tudo que sucede o elemento raiz, preservado literalmente.
    pub epilog: String,
}

/// Converte strings vazias em `None`: texto ausente e texto vazio são a mesma coisa.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl Document {
    /// Cria um documento contendo apenas o elemento raiz `root_name`.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Element, root_name.into())],
            root: NodeId(0),
            prolog: String::new(),
            epilog: String::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total de nós na arena (incluindo os desanexados).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    // ---------------------------------------------------------------
    // Criação
    // ---------------------------------------------------------------

    /// Cria um elemento desanexado.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Element, name.into()))
    }

    /// Cria um elemento desanexado já com atributos.
    pub fn create_element_with_attrs(
        &mut self,
        name: impl Into<String>,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element, name.into());
        data.attrs = attrs;
        self.push(data)
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(NodeKind::Comment, String::new());
        data.text = non_empty(Some(content.into()));
        self.push(data)
    }

    pub fn create_processing_instruction(
        &mut self,
        target: impl Into<String>,
        data: impl Into<String>,
    ) -> NodeId {
        let mut node = NodeData::new(NodeKind::ProcessingInstruction, target.into());
        node.text = non_empty(Some(data.into()));
        self.push(node)
    }

    // ---------------------------------------------------------------
    // Nome, atributos, texto
    // ---------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Element
    }

    /// Nome qualificado (ex: `tei:w`).
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Nome sem prefixo de namespace (ex: `tei:w` → `w`).
    /// Comentários e instruções de processamento têm nome local vazio.
    pub fn local_name(&self, id: NodeId) -> &str {
        match self.kind(id) {
            NodeKind::Element => {
                let name = self.name(id);
                name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
            }
            _ => "",
        }
    }

    /// Prefixo de namespace do nome, se houver.
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.name(id).split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        &self.nodes[id.0].attrs
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Define (ou substitui) um atributo, preservando a posição se já existir.
    pub fn set_attr(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let attrs = &mut self.nodes[id.0].attrs;
        match attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => attrs.push((key, value)),
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        self.nodes[id.0].text = non_empty(text);
    }

    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].tail.as_deref()
    }

    pub fn set_tail(&mut self, id: NodeId, tail: Option<String>) {
        self.nodes[id.0].tail = non_empty(tail);
    }

    /// Acrescenta texto ao `text` de um nó.
    pub fn append_text(&mut self, id: NodeId, extra: &str) {
        if extra.is_empty() {
            return;
        }
        self.nodes[id.0]
            .text
            .get_or_insert_with(String::new)
            .push_str(extra);
    }

    /// Acrescenta texto ao `tail` de um nó.
    pub fn append_tail(&mut self, id: NodeId, extra: &str) {
        if extra.is_empty() {
            return;
        }
        self.nodes[id.0]
            .tail
            .get_or_insert_with(String::new)
            .push_str(extra);
    }

    // ---------------------------------------------------------------
    // Navegação
    // ---------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Posição do nó entre os filhos do pai.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Ancestrais, do pai até a raiz.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Descendentes em ordem de documento (pré-ordem), sem incluir o próprio nó.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Descendentes (ordem de documento) cujo nome local está em `names`.
    pub fn find_descendants(&self, id: NodeId, names: &[&str]) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| names.contains(&self.local_name(d)))
            .collect()
    }

    /// Texto concatenado da subárvore (sem o `tail` do próprio nó).
    /// Comentários e instruções de processamento não contribuem.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if !self.is_element(id) {
            return;
        }
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for &child in self.children(id) {
            self.collect_text(child, out);
            // o tail pertence ao fluxo deste nó, mesmo quando o filho é um comentário
            if let Some(tail) = self.tail(child) {
                out.push_str(tail);
            }
        }
    }

    // ---------------------------------------------------------------
    // Mutação estrutural
    // ---------------------------------------------------------------

    /// Remove o nó da lista de filhos do pai. O nó (e seu `tail`) continua na arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Anexa `child` como último filho de `parent`, desanexando-o antes se preciso.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insere `child` na posição `index` (limitada ao número de filhos).
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Desanexa todos os filhos atuais e os substitui por `children`.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let old = std::mem::take(&mut self.nodes[parent.0].children);
        for id in old {
            self.nodes[id.0].parent = None;
        }
        for child in children {
            self.append_child(parent, child);
        }
    }

    /// Retira e devolve todos os filhos de `parent` (desanexados, com seus tails).
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let old = std::mem::take(&mut self.nodes[parent.0].children);
        for &id in &old {
            self.nodes[id.0].parent = None;
        }
        old
    }

    /// Cópia profunda e desanexada da subárvore. O `tail` do nó copiado é descartado,
    /// os `tail`s dos descendentes são mantidos.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let source = &self.nodes[id.0];
        let mut data = NodeData::new(source.kind, source.name.clone());
        data.attrs = source.attrs.clone();
        data.text = source.text.clone();
        let children = source.children.clone();
        let copy = self.push(data);
        for child in children {
            let child_copy = self.deep_copy(child);
            let tail = self.nodes[child.0].tail.clone();
            self.nodes[child_copy.0].tail = tail;
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Cópia rasa: mesmo nome e atributos, sem texto nem filhos.
    pub fn shallow_copy(&mut self, id: NodeId) -> NodeId {
        let source = &self.nodes[id.0];
        let mut data = NodeData::new(source.kind, source.name.clone());
        data.attrs = source.attrs.clone();
        self.push(data)
    }
}
