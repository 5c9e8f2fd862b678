use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::FlowError;

#[derive(Clone)]
struct Vertex<Item> {
    item: Item,
    in_degree: usize,
}

/// A small topological sorter used by the loader to detect cyclic imports
/// between flow declaration files (spec §4.6: "the loader must detect and
/// reject cyclic imports"). Runtime connection graphs are *not* sorted with
/// this: they may legally contain cycles (feedback loops), so child start
/// order is declaration order, not dependency order.
pub struct TopologicalSorter<Item> {
    vertices: HashMap<Item, Vertex<Item>>,
    edges: HashMap<Item, HashSet<Item>>,
}

impl<Item> Default for TopologicalSorter<Item>
where
    Item: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Item> TopologicalSorter<Item>
where
    Item: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        TopologicalSorter { vertices: HashMap::new(), edges: HashMap::new() }
    }

    pub fn add_vertex(&mut self, item: Item) {
        if !self.vertices.contains_key(&item) {
            self.vertices.insert(item.clone(), Vertex { item, in_degree: 0 });
        }
    }

    pub fn add_dep(&mut self, from: Item, to: Item) {
        self.vertices.entry(from.clone()).or_insert(Vertex { item: from.clone(), in_degree: 0 });
        let to_vertex = self.vertices.entry(to.clone()).or_insert(Vertex { item: to.clone(), in_degree: 0 });
        self.edges.entry(from).or_default().insert(to);
        to_vertex.in_degree += 1;
    }

    pub fn topological_sort(&self) -> crate::Result<Vec<Item>> {
        let mut in_degree =
            self.vertices.values().map(|v| (v.item.clone(), v.in_degree)).collect::<HashMap<_, _>>();

        let mut sorted = Vec::with_capacity(self.vertices.len());
        let mut sources: Vec<Item> =
            in_degree.iter().filter(|&(_, &degree)| degree == 0).map(|(item, _)| item.clone()).collect();

        while let Some(source) = sources.pop() {
            sorted.push(source.clone());

            if let Some(neighbors) = self.edges.get(&source) {
                for neighbor in neighbors {
                    if let Some(degree) = in_degree.get_mut(neighbor) {
                        *degree -= 1;
                        if *degree == 0 {
                            sources.push(neighbor.clone());
                        }
                    }
                }
            }
        }

        if sorted.len() != self.vertices.len() {
            return Err(FlowError::CyclicImport("dependency graph has a cycle".to_string()).into());
        }

        Ok(sorted)
    }
}
