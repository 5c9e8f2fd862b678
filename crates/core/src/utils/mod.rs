mod topo;

pub use topo::TopologicalSorter;
