use crate::{
    Constant, Data,
    constant::{Array, List},
    machine::{Error, Value},
};

pub fn choose(list: List, empty: Value, then: Value) -> Value {
    if list.items.is_empty() { empty } else { then }
}

pub fn mk_cons(head: Constant, mut tail: List) -> Result<List, Error> {
    if head.type_of() != tail.element {
        return Err(Error::TypeMismatch);
    }
    tail.items.insert(0, head);
    Ok(tail)
}

pub fn head(list: List) -> Option<Constant> {
    list.items.into_iter().next()
}

pub fn tail(mut list: List) -> Option<List> {
    if list.items.is_empty() {
        None
    } else {
        list.items.remove(0);
        Some(list)
    }
}

pub fn null(list: List) -> bool {
    list.items.is_empty()
}

pub fn drop(count: rug::Integer, mut list: List) -> List {
    if count.is_negative() {
        return list;
    }
    let count = count.to_usize().unwrap_or(usize::MAX).min(list.items.len());
    list.items.drain(..count);
    list
}

pub fn to_array(list: List) -> Array {
    Array(list)
}

pub fn mk_nil(_: ()) -> Vec<Data> {
    Vec::new()
}

pub fn mk_nil_pair(_: ()) -> Vec<(Data, Data)> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Type;

    fn integers(items: &[i32]) -> List {
        List::new(
            Type::Integer,
            items.iter().map(|i| Constant::Integer((*i).into())).collect(),
        )
    }

    #[test]
    fn heads_and_tails() {
        assert_eq!(head(integers(&[1, 2])), Some(Constant::Integer(1.into())));
        assert_eq!(head(integers(&[])), None);
        assert_eq!(tail(integers(&[1, 2])), Some(integers(&[2])));
        assert_eq!(tail(integers(&[])), None);
    }

    #[test]
    fn cons_checks_the_element_type() {
        assert_eq!(
            mk_cons(Constant::Integer(0.into()), integers(&[1])),
            Ok(integers(&[0, 1]))
        );
        assert_eq!(
            mk_cons(Constant::Boolean(true), integers(&[1])),
            Err(Error::TypeMismatch)
        );
    }

    #[test]
    fn drop_clamps() {
        assert_eq!(drop((-3).into(), integers(&[1, 2])), integers(&[1, 2]));
        assert_eq!(drop(1.into(), integers(&[1, 2])), integers(&[2]));
        assert_eq!(drop(100.into(), integers(&[1, 2])), integers(&[]));
    }
}
