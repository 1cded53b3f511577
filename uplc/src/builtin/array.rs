use crate::{
    Constant,
    constant::{Array, List},
};

pub fn length(array: Array) -> rug::Integer {
    rug::Integer::from(array.0.items.len())
}

pub fn index(mut array: Array, index: rug::Integer) -> Option<Constant> {
    let index = index.to_usize()?;
    if index >= array.0.items.len() {
        return None;
    }
    Some(array.0.items.swap_remove(index))
}

pub fn multi_index(array: Array, indices: Vec<rug::Integer>) -> Option<List> {
    let items = indices
        .into_iter()
        .map(|i| {
            let i = i.to_usize()?;
            array.0.items.get(i).cloned()
        })
        .collect::<Option<Vec<Constant>>>()?;
    Some(List::new(array.0.element, items))
}
