pub(crate) static SIMPLE: &str = r#"
function add(int x, int y) returns int {
    return x + y;
}
"#;

pub(crate) static MEDIUM: &str = r#"
import ballerina/io;

type Person record {|
    string name;
    int age;
    string? email = ();
|};

const int LIMIT = 10;

class Counter {
    private int count = 0;

    function increment(int by = 1) returns int {
        self.count += by;
        return self.count;
    }
}

function adults(Person[] people) returns string[] {
    return from Person p in people
        where p.age >= 18
        limit LIMIT
        select p.name;
}

function classify(int n) returns string {
    if n < 0 {
        return "negative";
    } else if n == 0 {
        return "zero";
    }
    int total = 0;
    foreach int i in 0 ..< n {
        total += i;
    }
    while total > 100 {
        total = total / 2;
    }
    return string `positive: ${total}`;
}

function parse(string text) returns int|error {
    int value = check int:fromString(text);
    return value * 2;
}

public function main() {
    Counter counter = new;
    Person[] people = [{name: "Ann", age: 30}, {name: "Bob", age: 12}];
    string[] names = adults(people);
    map<int> ages = {ann: 30};
    int? bob = ages["bob"];
    int age = bob ?: counter.increment();
    io:println(names, age, classify(age));
}
"#;

pub(crate) static CANDIDATES: [(&str, &str); 2] = [("simple", SIMPLE), ("medium", MEDIUM)];
